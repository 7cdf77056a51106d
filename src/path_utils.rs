//! Path comparison helpers for deterministic result ordering.

use std::cmp::Ordering;

/// Case-insensitive natural-order comparison: ASCII letters compare folded,
/// and maximal digit runs compare by numeric value, so `file2.rs` sorts
/// before `file10.rs`. Strings that differ only in case or in leading zeros
/// compare equal here; callers needing a total order tie-break with a raw
/// byte comparison.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut x = a;
    let mut y = b;

    loop {
        let (cx, cy) = match (x.chars().next(), y.chars().next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(cx), Some(cy)) => (cx, cy),
        };

        if cx.is_ascii_digit() && cy.is_ascii_digit() {
            let xe = x.find(|c: char| !c.is_ascii_digit()).unwrap_or(x.len());
            let ye = y.find(|c: char| !c.is_ascii_digit()).unwrap_or(y.len());

            let dx = x[..xe].trim_start_matches('0');
            let dy = y[..ye].trim_start_matches('0');

            // Longer stripped run means larger value; equal lengths compare
            // lexically, which for equal-length digit runs is numeric order.
            let ord = dx.len().cmp(&dy.len()).then_with(|| dx.cmp(dy));
            if ord != Ordering::Equal {
                return ord;
            }

            x = &x[xe..];
            y = &y[ye..];
        } else {
            let fx = cx.to_ascii_lowercase();
            let fy = cy.to_ascii_lowercase();
            if fx != fy {
                return fx.cmp(&fy);
            }
            x = &x[cx.len_utf8()..];
            y = &y[cy.len_utf8()..];
        }
    }
}
