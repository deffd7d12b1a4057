use crate::calculator::PricingResult;
use crate::estimator::ResourceCost;
use comfy_table::{Cell, Color, Table};

pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Window charges are fractions of a cent, so keep six decimals.
pub fn format_cost(cost: f64, currency: &str) -> String {
    format!("{:.6} {}", cost, currency)
}

pub fn format_monthly(cost: f64, currency: &str) -> String {
    format!("{:.2} {}", cost, currency)
}

fn breakdown_summary(result: &PricingResult) -> String {
    result
        .breakdown
        .iter()
        .filter(|(_, cost)| **cost > 0.0)
        .map(|(name, cost)| format!("{}={:.6}", name, cost))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn cost_table(costs: &[ResourceCost], detailed: bool) -> Table {
    let mut table = Table::new();
    if detailed {
        table.set_header(vec!["Resource", "Service", "Window cost", "Monthly", "Breakdown"]);
    } else {
        table.set_header(vec!["Resource", "Service", "Window cost", "Monthly"]);
    }

    for cost in costs {
        let monthly = Cell::new(format_monthly(
            cost.result.estimated_monthly_charge,
            &cost.result.currency,
        ));
        let monthly = if cost.result.estimated_monthly_charge > 0.0 {
            monthly.fg(Color::Yellow)
        } else {
            monthly
        };
        let mut row = vec![
            Cell::new(&cost.resource.id),
            Cell::new(cost.resource.service.as_str()),
            Cell::new(format_cost(cost.result.total_cost, &cost.result.currency)),
            monthly,
        ];
        if detailed {
            let summary = breakdown_summary(&cost.result);
            row.push(Cell::new(if summary.is_empty() { "-".to_string() } else { summary }));
        }
        table.add_row(row);
    }
    table
}
