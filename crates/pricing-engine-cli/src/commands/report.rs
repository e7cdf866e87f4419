use clap::Args;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tracing::info;

use pricing_engine_core::{calculate_price, report};

use super::pricing::{build_request, RequestArgs};
use super::Context;

#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Directory for the export file
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Print the record to stdout instead of writing a file
    #[arg(long)]
    pub print: bool,
}

pub fn run_export(ctx: &Context, args: ExportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = build_request(ctx, args.request)?;
    let output = calculate_price(&ctx.rules, &request, &ctx.config)?;

    let timestamp = chrono::Local::now().naive_local();
    let text = report::render_text(&request, &output, timestamp);
    let price = output.result.price.rounded();

    if args.print {
        print!("{text}");
        return Ok(json!({
            "result": {
                "gross_price": price.gross_price,
                "margin_band": price.margin_band,
            },
            "warnings": output.warnings,
        }));
    }

    fs::create_dir_all(&args.out_dir)
        .map_err(|e| format!("Failed to create '{}': {}", args.out_dir.display(), e))?;
    let path = args.out_dir.join(report::export_file_name(timestamp));
    fs::write(&path, &text).map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    info!(path = %path.display(), "Exported pricing record");

    Ok(json!({
        "result": {
            "path": path.display().to_string(),
            "gross_price": price.gross_price,
            "margin_band": price.margin_band,
        },
        "warnings": output.warnings,
    }))
}
