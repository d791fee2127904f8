//! 最优在线分段线性近似
//!
//! 点为 `(key, pos ± err)`。上凸包保存 `pos + err` 的点，下凸包保存
//! `pos - err` 的点，`rect` 保存可行斜率锥的四个极端点：
//!
//! - `rect[0]` / `rect[2]`：决定最小斜率 `slope1` 的两点
//! - `rect[1]` / `rect[3]`：决定最大斜率 `slope2` 的两点
//!
//! 新 key 落在锥外时关闭当前分段，取两极端斜率的中点，
//! 截距由两条极端直线的交点求得。每个 key 均摊 O(1)。

use super::model::{Model, Segment};

type Point = (i64, i64);

#[inline]
fn slope(a: Point, b: Point) -> f64 {
    (b.1 - a.1) as f64 / (b.0 as i128 - a.0 as i128) as f64
}

#[inline]
fn cross(o: Point, a: Point, b: Point) -> f64 {
    slope(b, o) - slope(a, o)
}

/// 流式 OptPLA
///
/// ```ignore
/// let mut pla = OptPla::new(err);
/// for key in keys { pla.add_key(key); }
/// let segments = pla.finish();
/// ```
#[derive(Debug, Clone)]
pub struct OptPla {
    err: i64,
    keys: Vec<i64>,
    rect: [Point; 4],
    upper: Vec<Point>,
    lower: Vec<Point>,
    upper_start: usize,
    lower_start: usize,
    segments: Vec<Segment>,
}

impl OptPla {
    pub fn new(err: u32) -> Self {
        Self {
            err: err as i64,
            keys: Vec::new(),
            rect: [(0, 0); 4],
            upper: Vec::new(),
            lower: Vec::new(),
            upper_start: 0,
            lower_start: 0,
            segments: Vec::new(),
        }
    }

    /// 批量分段，空输入得到空结果
    pub fn build(keys: &[i64], err: u32) -> Vec<Segment> {
        let mut pla = Self::new(err);
        for &key in keys {
            pla.add_key(key);
        }
        pla.finish()
    }

    /// 当前分段数（含尚未关闭的分段）
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len() + usize::from(!self.keys.is_empty())
    }

    /// 追加一个 key，调用方保证严格递增
    pub fn add_key(&mut self, key: i64) {
        debug_assert!(
            self.keys.last().map_or(true, |&last| last < key),
            "OptPla input must be strictly increasing"
        );

        let y = self.keys.len() as i64;
        let p1 = (key, y + self.err);
        let p2 = (key, y - self.err);

        if self.keys.is_empty() {
            self.rect[0] = p1;
            self.rect[1] = p2;
            self.upper.push(p1);
            self.lower.push(p2);
            self.keys.push(key);
            return;
        }
        if self.keys.len() == 1 {
            self.rect[2] = p2;
            self.rect[3] = p1;
            self.upper.push(p1);
            self.lower.push(p2);
            self.keys.push(key);
            return;
        }

        let slope1 = slope(self.rect[2], self.rect[0]);
        let slope2 = slope(self.rect[3], self.rect[1]);
        if slope(p1, self.rect[2]) < slope1 || slope(p2, self.rect[3]) > slope2 {
            self.close_segment();
            self.add_key(key);
            return;
        }

        if slope(p1, self.rect[1]) < slope2 {
            // 收紧最大斜率：在下凸包上找与 p1 斜率最小的点
            let mut min = slope(self.lower[self.lower_start], p1);
            let mut min_i = self.lower_start;
            for i in self.lower_start + 1..self.lower.len() {
                let val = slope(self.lower[i], p1);
                if val > min {
                    break;
                }
                min = val;
                min_i = i;
            }
            self.rect[1] = self.lower[min_i];
            self.rect[3] = p1;
            self.lower_start = min_i;

            while self.upper.len() >= self.upper_start + 2 {
                let n = self.upper.len();
                if cross(self.upper[n - 2], self.upper[n - 1], p1) <= 0.0 {
                    self.upper.pop();
                } else {
                    break;
                }
            }
            self.upper.push(p1);
        }

        if slope(p2, self.rect[0]) > slope1 {
            // 收紧最小斜率：在上凸包上找与 p2 斜率最大的点
            let mut max = slope(self.upper[self.upper_start], p2);
            let mut max_i = self.upper_start;
            for i in self.upper_start + 1..self.upper.len() {
                let val = slope(self.upper[i], p2);
                if val < max {
                    break;
                }
                max = val;
                max_i = i;
            }
            self.rect[0] = self.upper[max_i];
            self.rect[2] = p2;
            self.upper_start = max_i;

            while self.lower.len() >= self.lower_start + 2 {
                let n = self.lower.len();
                if cross(self.lower[n - 2], self.lower[n - 1], p2) >= 0.0 {
                    self.lower.pop();
                } else {
                    break;
                }
            }
            self.lower.push(p2);
        }

        self.keys.push(key);
    }

    /// 关闭最后一个分段并返回全部分段
    pub fn finish(mut self) -> Vec<Segment> {
        if !self.keys.is_empty() {
            self.close_segment();
        }
        self.segments
    }

    fn close_segment(&mut self) {
        let model = self.current_model();
        let keys = std::mem::take(&mut self.keys);
        self.segments.push(Segment { model, keys });

        self.upper.clear();
        self.lower.clear();
        self.upper_start = 0;
        self.lower_start = 0;
        self.rect = [(0, 0); 4];
    }

    fn current_model(&self) -> Model {
        let n = self.keys.len();
        if n == 1 {
            let mid = (self.rect[0].1 + self.rect[1].1) as f64 / 2.0;
            return Model::new(0.0, mid);
        }

        let [r0, r1, _, _] = self.rect;
        let slope1 = slope(self.rect[2], r0);
        let slope2 = slope(self.rect[3], r1);
        let s = (slope1 + slope2) / 2.0;

        let intercept = if slope1 == slope2 {
            r0.0 as f64 - r0.1 as f64 / s
        } else {
            let (x0r, y0r) = (r0.0 as f64, r0.1 as f64);
            let (x1r, y1r) = (r1.0 as f64, r1.1 as f64);
            let tmp = slope2 - slope1;
            let x0 = (y0r - slope1 * x0r + slope2 * x1r - y1r) / tmp;
            let y0 = (slope1 * slope2 * (x1r - x0r) + y0r * slope2 - y1r * slope1) / tmp;
            x0 - y0 / s
        };

        if s > 0.0 && s.is_finite() && intercept.is_finite() {
            return Model::new(s, intercept);
        }

        // 精度退化（极大 key 跨度）时退回首尾两点的直线
        let first = self.keys[0];
        let last = self.keys[n - 1];
        let span = (last as i128 - first as i128) as f64;
        let s = (n - 1) as f64 / span;
        if s > 0.0 && s.is_finite() {
            Model::new(s, first as f64)
        } else {
            Model::new(0.0, 0.0)
        }
    }
}
