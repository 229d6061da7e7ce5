use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::InspectArgs,
    config::ExportConfig,
    export::{build_schema, load_previous},
    io_utils,
    proto_gen::render_proto,
    registry::CommonTypes,
    sheet::{SheetTable, TextSource},
    table,
};

pub fn execute(args: &InspectArgs) -> Result<()> {
    let config = ExportConfig::resolve(args.config.as_deref(), args.out_dir.as_deref())?;
    let source = TextSource {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
    };
    let compiler = config.compiler();
    let registry = CommonTypes::load(
        compiler.as_ref(),
        &config.include_paths,
        &config.common_files,
    )
    .context("Loading common proto files")?;

    let table = SheetTable::load(&args.input, &args.sheet, source)?;
    let paths = config.artifact_paths(&args.sheet);
    let previous = load_previous(&config, &paths, compiler.as_ref(), &args.sheet);
    let schema = build_schema(&table, previous, &registry)
        .with_context(|| format!("Inspecting sheet '{}' of {:?}", args.sheet, args.input))?;
    info!(
        "Sheet '{}' declares {} node(s) across {} column(s)",
        args.sheet,
        schema.tree().field_count(),
        table.column_count()
    );

    if args.proto {
        print!("{}", render_proto(&schema, &paths.proto_file, &config.package));
    } else if args.json {
        let summary = schema.tree().summary();
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        table::print_summary(&schema.tree().summary());
    }
    Ok(())
}
