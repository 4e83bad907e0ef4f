use chrono::{DateTime, Utc};

use crate::humanize::humanize_time_at;
use crate::model::Displayable;

/// Relative widths of backend, type, name, status and changed.
pub const COLUMN_WEIGHTS: [usize; 5] = [3, 3, 12, 7, 5];

const NAME_COLUMN: usize = 2;
const STATUS_COLUMN: usize = 3;
const MISSING: &str = "-";

/// Splits `total_width` into column budgets that add up to exactly
/// `total_width`.
pub fn column_widths(total_width: usize) -> [usize; 5] {
    let unit = total_width / COLUMN_WEIGHTS.iter().sum::<usize>();
    let mut widths = COLUMN_WEIGHTS.map(|weight| unit * weight);

    let remainder = total_width - widths.iter().sum::<usize>();
    let mut widest = 0;
    for index in 1..widths.len() {
        if widths[index] > widths[widest] {
            widest = index;
        }
    }
    widths[widest] += remainder;
    widths
}

pub fn render_row<D>(item: &D, total_width: usize) -> String
where
    D: Displayable + ?Sized,
{
    render_row_at(item, total_width, Utc::now())
}

pub fn render_row_at<D>(item: &D, total_width: usize, now: DateTime<Utc>) -> String
where
    D: Displayable + ?Sized,
{
    let widths = column_widths(total_width);
    let changed = item
        .last_changed()
        .map(|at| humanize_time_at(at, now))
        .unwrap_or_else(|| MISSING.to_string());

    let fields = [
        item.backend_name().to_string(),
        item.resource_type().to_string(),
        item.displayed_name(),
        item.status(),
        changed,
    ];

    let mut row = String::with_capacity(total_width);
    for (index, (field, width)) in fields.iter().zip(widths).enumerate() {
        let visible = match index {
            NAME_COLUMN | STATUS_COLUMN => width.saturating_sub(1),
            _ => width,
        };
        row.push_str(&fit(field, visible, width));
    }
    row
}

/// Cuts `text` to `visible` characters and pads it with spaces to `width`.
fn fit(text: &str, visible: usize, width: usize) -> String {
    let mut fitted = text
        .chars()
        .filter(|c| !c.is_control())
        .take(visible.min(width))
        .collect::<String>();
    let used = fitted.chars().count();
    fitted.extend(std::iter::repeat_n(' ', width - used));
    fitted
}
