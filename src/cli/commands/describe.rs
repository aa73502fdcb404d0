//! Describe command - show a detector type's parameters

use crate::cli::args::{DescribeArgs, OutputFormat};
use crate::error::TpodResult;
use crate::provider::ProviderRegistry;
use console::style;

/// Execute the describe command
pub async fn execute(args: DescribeArgs, registry: &ProviderRegistry) -> TpodResult<()> {
    let descriptor = registry.lookup(&args.type_id)?;
    let params = registry.describe(&args.type_id)?;

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "type_id": descriptor.type_id,
                "display_name": descriptor.display_name,
                "required": params.required,
                "optional": params.optional,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            println!(
                "{} ({})",
                style(&descriptor.display_name).bold(),
                descriptor.type_id
            );
            println!();
            println!("{:<24} {:<10} {}", "PARAMETER", "KIND", "DEFAULT");
            println!("{}", "-".repeat(50));
            for name in &params.required {
                println!("{:<24} {:<10} {}", name, style("required").yellow(), "-");
            }
            for (name, default) in &params.optional {
                println!("{:<24} {:<10} {}", name, "optional", default);
            }
        }
        OutputFormat::Plain => {
            for name in &params.required {
                println!("{}", name);
            }
            for (name, default) in &params.optional {
                println!("{}={}", name, default);
            }
        }
    }

    Ok(())
}
