//! Types command - list registered detector types

use crate::cli::args::{OutputFormat, TypesArgs};
use crate::error::TpodResult;
use crate::provider::ProviderRegistry;
use serde::Serialize;

#[derive(Serialize)]
struct TypeJson<'a> {
    type_id: &'a str,
    display_name: &'a str,
}

/// Execute the types command
pub async fn execute(args: TypesArgs, registry: &ProviderRegistry) -> TpodResult<()> {
    let types = registry.list();

    match args.format {
        OutputFormat::Table => {
            println!("{:<36} {}", "TYPE", "NAME");
            println!("{}", "-".repeat(72));
            for (type_id, display_name) in &types {
                println!("{:<36} {}", type_id, display_name);
            }
        }
        OutputFormat::Json => {
            let json: Vec<TypeJson> = types
                .iter()
                .map(|(type_id, display_name)| TypeJson {
                    type_id,
                    display_name,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Plain => {
            for (type_id, _) in &types {
                println!("{}", type_id);
            }
        }
    }

    Ok(())
}
