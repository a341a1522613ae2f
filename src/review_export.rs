use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::model::{GameRequest, ReconciliationResult};
use crate::review::{headline, review_rows};

pub struct ExportReport {
    pub path: PathBuf,
    pub review_rows: usize,
    pub raw_lines: usize,
}

pub fn default_export_path(request: &GameRequest) -> PathBuf {
    let slug = |name: &str| {
        name.trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect::<String>()
    };
    PathBuf::from(format!(
        "review_{}_{}_at_{}.xlsx",
        request.season,
        slug(&request.away_team),
        slug(&request.home_team)
    ))
}

pub fn export_review(path: &Path, result: &ReconciliationResult) -> Result<ExportReport> {
    let head = headline(result);
    let mut review = vec![vec![
        String::new(),
        "Predicted".to_string(),
        "Actual".to_string(),
        "Delta (Act - Pred)".to_string(),
    ]];
    for row in review_rows(result) {
        review.push(vec![row.label, row.predicted, row.actual, row.delta]);
    }
    review.push(Vec::new());
    review.push(vec!["Status".to_string(), result.schedule_status.label().to_string()]);
    review.push(vec![
        "Favored".to_string(),
        format!("{} by {}", head.favored, head.margin),
    ]);
    if let Some(confidence) = head.confidence {
        review.push(vec!["Confidence".to_string(), format!("{confidence:.1}")]);
    }

    let raw_json = serde_json::to_string_pretty(result).context("serialize result")?;
    let raw: Vec<Vec<String>> = raw_json.lines().map(|line| vec![line.to_string()]).collect();

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Review")?;
        write_rows(sheet, &review)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Raw")?;
        write_rows(sheet, &raw)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        path: path.to_path_buf(),
        review_rows: review.len().saturating_sub(1),
        raw_lines: raw.len(),
    })
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
