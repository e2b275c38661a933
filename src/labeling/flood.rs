//! Local connected-component labeling of the fluid cells.

use crate::grid::CellScalars;

/// Labels 6-connected fluid components of a cell field.
///
/// Returns one label per cell (`-1` for non-fluid) and the component
/// count; labels are dense ordinals in discovery (k-j-i scan) order.
pub fn flood_fill(cell_res: [usize; 3], vof: &CellScalars, emf0: f32) -> (Vec<i32>, usize) {
    let (w, h, d) = (cell_res[0], cell_res[1], cell_res[2]);
    let n = w * h * d;
    let mut labels = vec![-1i32; n];
    let mut next = 0i32;
    let mut stack: Vec<usize> = Vec::new();

    let is_fluid = |idx: usize| vof.value(idx) > emf0;

    for start in 0..n {
        if labels[start] >= 0 || !is_fluid(start) {
            continue;
        }
        labels[start] = next;
        stack.push(start);
        while let Some(idx) = stack.pop() {
            let i = idx % w;
            let j = (idx / w) % h;
            let k = idx / (w * h);
            let mut visit = |nb: usize| {
                if labels[nb] < 0 && is_fluid(nb) {
                    labels[nb] = next;
                    stack.push(nb);
                }
            };
            if i > 0 {
                visit(idx - 1);
            }
            if i + 1 < w {
                visit(idx + 1);
            }
            if j > 0 {
                visit(idx - w);
            }
            if j + 1 < h {
                visit(idx + w);
            }
            if k > 0 {
                visit(idx - w * h);
            }
            if k + 1 < d {
                visit(idx + w * h);
            }
        }
        next += 1;
    }
    (labels, next as usize)
}
