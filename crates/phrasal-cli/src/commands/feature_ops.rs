use serde::Serialize;

use phrasal_core::objective::Objective;

/// One global dense dimension of the objective.
#[derive(Debug, Serialize)]
pub struct FeatureRow {
    pub index: usize,
    pub feature: String,
    pub description: String,
    pub weight: f32,
}

pub fn feature_rows(objective: &Objective) -> Vec<FeatureRow> {
    let mut rows = Vec::with_capacity(objective.dense_feature_count());
    for (i, name) in objective.feature_names().enumerate() {
        for index in objective.feature_range(i) {
            rows.push(FeatureRow {
                index,
                feature: name.to_string(),
                description: objective.feature_description(index),
                weight: objective.weights()[index],
            });
        }
    }
    rows
}

pub fn format_rows(rows: &[FeatureRow]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&format!(
            "{:>3}  {:<14} {:<24} weight={}\n",
            row.index, row.feature, row.description, row.weight
        ));
    }
    out
}

pub fn features_cmd(table: &str, lm: &str, weights: Option<&str>, json: bool) {
    let engine = super::open_engine(table, lm, weights);
    let rows = feature_rows(engine.objective());
    if json {
        println!(
            "{}",
            die!(
                serde_json::to_string_pretty(&rows),
                "Error serializing features: {}"
            )
        );
    } else {
        print!("{}", format_rows(&rows));
    }
}
