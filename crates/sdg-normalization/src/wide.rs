//! Long-to-wide reshapes of normalized rows.

use std::collections::BTreeMap;

use sdg_model::{ObservationRow, RawTable};

use crate::normalize::format_period;

/// Pivot years into columns: one row per (indicator, iso3, dimensions)
/// series, one column per observed period.
pub fn wide_by_year(rows: &[ObservationRow]) -> RawTable {
    let mut periods: Vec<String> = Vec::new();
    for row in rows {
        if let Some(p) = row.period {
            let label = format_period(p);
            if !periods.contains(&label) {
                periods.push(label);
            }
        }
    }
    periods.sort_by(|a, b| {
        a.parse::<f64>()
            .unwrap_or(f64::MAX)
            .total_cmp(&b.parse::<f64>().unwrap_or(f64::MAX))
    });

    let mut columns = vec![
        "indicator".to_string(),
        "iso3".to_string(),
        "country_name".to_string(),
    ];
    columns.extend(periods.iter().cloned());
    let mut table = RawTable::new(columns);

    // series key -> (head cells, period label -> value)
    let mut series: BTreeMap<String, (Vec<String>, BTreeMap<String, String>)> = BTreeMap::new();
    for row in rows {
        let key = format!(
            "{}\u{1f}{}\u{1f}{:?}",
            row.indicator, row.iso3, row.dimensions
        );
        let entry = series.entry(key).or_insert_with(|| {
            (
                vec![
                    row.indicator.clone(),
                    row.iso3.clone(),
                    row.country_name.clone(),
                ],
                BTreeMap::new(),
            )
        });
        if let (Some(period), Some(value)) = (row.period, row.value) {
            entry.1.insert(format_period(period), value.to_string());
        }
    }

    for (head, values) in series.into_values() {
        let mut cells = head;
        for period in &periods {
            cells.push(values.get(period).cloned().unwrap_or_default());
        }
        table.push_row(cells);
    }
    table
}

/// Pivot indicators into columns: one row per (iso3, period), one column
/// per indicator code.
pub fn wide_by_indicator(rows: &[ObservationRow]) -> RawTable {
    let mut indicators: Vec<String> = Vec::new();
    for row in rows {
        if !indicators.contains(&row.indicator) {
            indicators.push(row.indicator.clone());
        }
    }
    indicators.sort();

    let mut columns = vec![
        "iso3".to_string(),
        "country_name".to_string(),
        "period".to_string(),
    ];
    columns.extend(indicators.iter().cloned());
    let mut table = RawTable::new(columns);

    let mut cells_by_key: BTreeMap<String, (Vec<String>, BTreeMap<String, String>)> =
        BTreeMap::new();
    for row in rows {
        let period_label = row.period.map(format_period).unwrap_or_default();
        let key = format!("{}\u{1f}{}", row.iso3, period_label);
        let entry = cells_by_key.entry(key).or_insert_with(|| {
            (
                vec![row.iso3.clone(), row.country_name.clone(), period_label],
                BTreeMap::new(),
            )
        });
        if let Some(value) = row.value {
            entry.1.insert(row.indicator.clone(), value.to_string());
        }
    }

    for (head, values) in cells_by_key.into_values() {
        let mut cells = head;
        for indicator in &indicators {
            cells.push(values.get(indicator).cloned().unwrap_or_default());
        }
        table.push_row(cells);
    }
    table
}
