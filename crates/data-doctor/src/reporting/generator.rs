use crate::error::{DoctorError, Result, ResultExt};
use crate::types::{DriftRecord, EvaluationOutcome, PipelineResult};
use chrono::Local;
use handlebars::Handlebars;
use polars::prelude::*;
use serde::Serialize;
use serde_json::{Value, json};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

pub const CLEANED_CSV_NAME: &str = "cleaned_output.csv";
pub const MARKDOWN_REPORT_NAME: &str = "audit_report.md";
pub const JSON_REPORT_NAME: &str = "audit_report.json";

const AUDIT_TEMPLATE: &str = r#"# Data Doctor Audit Report

**Input file:** {{input_file}}
**Generated:** {{generated_at}}

Rows: {{summary.rows_before}} -> {{summary.rows_after}} ({{summary.removed_duplicates}} duplicates removed).
Missing cells: {{summary.missing_before}} -> {{summary.missing_after}}.

## Schema Summary
{{#each schema}}
- **{{name}}**: dtype={{dtype}}, pct_null={{pct_null}}
{{/each}}

## Profile Summary
{{#each profile}}
- **{{name}}**: n_unique={{n_unique}}, pct_null={{pct_null}}{{#if stats}}, {{stats}}{{/if}}
{{/each}}

## Outliers
{{#each outliers}}
- **{{name}}**: {{count}} flagged rows
{{else}}
_No numeric columns._
{{/each}}

## Detected Drift
{{#each drift}}
- **{{name}}**: {{description}}
{{else}}
_No baseline supplied._
{{/each}}

## Drift Plots
{{#each drift_plots}}
### {{column}}

![{{column}} histogram]({{histogram}})
![{{column}} box plot]({{boxplot}})

{{else}}
_No drift plots._
{{/each}}

## Fix Suggestions
{{#each suggestions}}
- **{{name}}**: {{suggestion}}
{{/each}}

## Imputation Summary
{{#each imputations}}
- **{{name}}**: {{strategy}}
{{else}}
_No columns imputed._
{{/each}}

## Strategy Search
{{#if search}}
Target `{{search.target}}` ({{search.problem_type}}).
{{#each search.results}}
- {{pair}}: {{outcome}}
{{/each}}

Best: {{search.best}}
{{else}}
_Not run._
{{/if}}
"#;

/// JSON audit report: run metadata plus the full pipeline result.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport<'a> {
    pub generated_at: String,
    pub input_file: String,
    #[serde(flatten)]
    pub result: &'a PipelineResult,
}

/// Paths of everything written for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPaths {
    pub cleaned_csv: PathBuf,
    pub markdown_report: PathBuf,
    pub json_report: PathBuf,
}

/// Writes the cleaned dataset and the audit reports into one directory.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new("outputs")
    }
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn prepare_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir)
            .map_err(DoctorError::from)
            .context(format!("Creating output directory {}", self.output_dir.display()))
    }

    pub fn build_report<'a>(input_file: &str, result: &'a PipelineResult) -> AuditReport<'a> {
        AuditReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.to_string(),
            result,
        }
    }

    /// Write the cleaned dataset as `cleaned_output.csv`.
    pub fn write_cleaned_csv(&self, df: &DataFrame) -> Result<PathBuf> {
        self.prepare_dir()?;
        let path = self.output_dir.join(CLEANED_CSV_NAME);

        let mut file = File::create(&path)?;
        let mut df = df.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .finish(&mut df)
            .context("Writing cleaned CSV")?;

        info!("Cleaned dataset saved: {}", path.display());
        Ok(path)
    }

    /// Write the JSON report as `audit_report.json`.
    pub fn write_json_report(&self, report: &AuditReport<'_>) -> Result<PathBuf> {
        self.prepare_dir()?;
        let path = self.output_dir.join(JSON_REPORT_NAME);
        fs::write(&path, serde_json::to_string_pretty(report)?)?;

        info!("JSON report saved: {}", path.display());
        Ok(path)
    }

    /// Render the Markdown audit report.
    pub fn render_markdown(report: &AuditReport<'_>) -> Result<String> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);

        let context = Self::markdown_context(report);
        Ok(handlebars.render_template(AUDIT_TEMPLATE, &context)?)
    }

    /// Write the Markdown report as `audit_report.md`.
    pub fn write_markdown_report(&self, report: &AuditReport<'_>) -> Result<PathBuf> {
        let markdown = Self::render_markdown(report)?;
        self.prepare_dir()?;
        let path = self.output_dir.join(MARKDOWN_REPORT_NAME);
        fs::write(&path, markdown)?;

        info!("Audit report saved: {}", path.display());
        Ok(path)
    }

    /// Write the cleaned CSV and both reports.
    pub fn write_all(&self, input_file: &str, result: &PipelineResult) -> Result<ReportPaths> {
        let report = Self::build_report(input_file, result);
        Ok(ReportPaths {
            cleaned_csv: self.write_cleaned_csv(&result.cleaned_dataset)?,
            markdown_report: self.write_markdown_report(&report)?,
            json_report: self.write_json_report(&report)?,
        })
    }

    /// Template context with every number already formatted.
    fn markdown_context(report: &AuditReport<'_>) -> Value {
        let result = report.result;

        let schema: Vec<Value> = result
            .schema
            .iter()
            .map(|(name, s)| {
                json!({ "name": name, "dtype": s.dtype, "pct_null": format!("{:.2}", s.pct_null) })
            })
            .collect();

        let profile: Vec<Value> = result
            .profile
            .iter()
            .map(|(name, p)| {
                let stats = match (p.mean, p.std, p.min, p.max) {
                    (Some(mean), Some(std), Some(min), Some(max)) => format!(
                        "mean={:.4}, std={:.4}, min={:.4}, max={:.4}",
                        mean, std, min, max
                    ),
                    _ => String::new(),
                };
                json!({
                    "name": name,
                    "n_unique": p.n_unique,
                    "pct_null": format!("{:.2}", p.pct_null),
                    "stats": stats,
                })
            })
            .collect();

        let outliers: Vec<Value> = result
            .outliers
            .iter()
            .map(|(name, rows)| json!({ "name": name, "count": rows.len() }))
            .collect();

        let drift: Vec<Value> = result
            .drift
            .iter()
            .map(|(name, record)| {
                let description = match record {
                    DriftRecord::Computed {
                        mean_baseline,
                        mean_new,
                        mean_diff,
                    } => format!(
                        "mean_baseline={:.4}, mean_new={:.4}, mean_diff={:+.4}",
                        mean_baseline, mean_new, mean_diff
                    ),
                    DriftRecord::Insufficient { .. } => "insufficient_data".to_string(),
                };
                json!({ "name": name, "description": description })
            })
            .collect();

        let drift_plots: Vec<Value> = result
            .drift_plots
            .iter()
            .map(|p| {
                json!({
                    "column": p.column,
                    "histogram": p.histogram.display().to_string(),
                    "boxplot": p.boxplot.display().to_string(),
                })
            })
            .collect();

        let suggestions: Vec<Value> = result
            .suggestions
            .iter()
            .map(|(name, s)| json!({ "name": name, "suggestion": s.as_str() }))
            .collect();

        let imputations: Vec<Value> = result
            .imputation_meta
            .iter()
            .map(|(name, s)| json!({ "name": name, "strategy": s.as_str() }))
            .collect();

        let search = result.strategy_search.as_ref().map(|search| {
            let results: Vec<Value> = search
                .results
                .iter()
                .map(|r| {
                    let outcome = match &r.outcome {
                        EvaluationOutcome::Scored { score } => format!("score {:.4}", score),
                        EvaluationOutcome::Failed { reason } => format!("failed ({})", reason),
                    };
                    json!({ "pair": r.pair.to_string(), "outcome": outcome })
                })
                .collect();
            let best = match &search.best {
                Some(best) => format!("{} ({:.4})", best.pair, best.score),
                None => "none, configured defaults used".to_string(),
            };
            json!({
                "target": search.target_column,
                "problem_type": search.problem_type.as_str(),
                "results": results,
                "best": best,
            })
        });

        json!({
            "input_file": report.input_file,
            "generated_at": report.generated_at,
            "summary": {
                "rows_before": result.summary.rows_before,
                "rows_after": result.summary.rows_after,
                "removed_duplicates": result.dedupe_meta.removed_duplicates,
                "missing_before": result.summary.missing_before,
                "missing_after": result.summary.missing_after,
            },
            "schema": schema,
            "profile": profile,
            "outliers": outliers,
            "drift": drift,
            "drift_plots": drift_plots,
            "suggestions": suggestions,
            "imputations": imputations,
            "search": search,
        })
    }
}
