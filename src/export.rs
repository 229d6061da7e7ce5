//! Sheet export: header rows → proto text → compiled binding → row data.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use prost::Message;
use prost_reflect::{
    DescriptorPool, DynamicMessage, MessageDescriptor, Value, text_format::FormatOptions,
};

use crate::{
    cli::ExportArgs,
    compiler::{SchemaCompiler, decode_descriptor_set},
    config::{ArtifactPaths, ExportConfig},
    error::{ConvertError, ConvertResult},
    io_utils,
    proto_gen::{container_type_name, render_proto},
    registry::CommonTypes,
    sheet::{FIELD_COMMENT_ROW, FIELD_NAME_ROW, FIELD_TYPE_ROW, SheetTable, TextSource},
    tree::{BoundSchema, FinalizedSchema, SchemaBuilder},
};

const CONTAINER_ITEMS_FIELD: &str = "items";

/// What one sheet export produced.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub sheet: String,
    pub rows: usize,
    pub paths: ArtifactPaths,
}

/// The freshly compiled schema of one sheet.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub pool: DescriptorPool,
    pub record: MessageDescriptor,
    pub container: MessageDescriptor,
}

pub fn execute(args: &ExportArgs) -> Result<()> {
    let mut config = ExportConfig::resolve(args.config.as_deref(), args.out_dir.as_deref())?;
    if let Some(package) = &args.package {
        config.package = package.clone();
    }
    if let Some(timezone) = args.timezone {
        config.timezone = timezone;
    }
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

    for sheet in &args.sheets {
        info!("Exporting sheet '{sheet}' from {:?}", args.input);
        let table = SheetTable::load(&args.input, sheet, source)?;
        let summary = export_sheet(&table, &config, compiler.as_ref(), &registry)
            .with_context(|| format!("Exporting sheet '{sheet}' from {:?}", args.input))?;
        info!(
            "Exported {} row(s) of sheet '{}' to {:?}",
            summary.rows, summary.sheet, summary.paths.data
        );
    }
    Ok(())
}

/// Runs the whole pipeline for one sheet. The `.proto` and `.desc` files are
/// written as soon as the schema compiles; `.data` and `.txt` only once every
/// row has been transcribed.
pub fn export_sheet(
    table: &SheetTable,
    config: &ExportConfig,
    compiler: &dyn SchemaCompiler,
    registry: &CommonTypes,
) -> Result<ExportSummary> {
    let sheet = table.name();
    let paths = config.artifact_paths(sheet);
    let previous = load_previous(config, &paths, compiler, sheet);

    let schema = build_schema(table, previous, registry)?;
    let compiled = compile_schema(&schema, config, &paths, compiler)?;
    let bound = schema
        .bind(&compiled.record)?
        .with_timezone(config.timezone);
    info!(
        "Bound sheet '{sheet}' to {} ({} node(s))",
        compiled.record.full_name(),
        bound.tree().field_count()
    );

    let container = transcribe_rows(&bound, table, &compiled.container)?;
    let rows = table.data_rows().count();

    io_utils::write_output(&paths.data, container.encode_to_vec())?;
    info!("Wrote {:?}", paths.data);
    let text = container.to_text_format_with_options(&FormatOptions::new().pretty(true));
    io_utils::write_output(&paths.text, text)?;
    info!("Wrote {:?}", paths.text);

    Ok(ExportSummary {
        sheet: sheet.to_string(),
        rows,
        paths,
    })
}

/// Ingests every column of the header rows and finalizes the tree.
pub fn build_schema(
    table: &SheetTable,
    previous: Option<MessageDescriptor>,
    registry: &CommonTypes,
) -> ConvertResult<FinalizedSchema> {
    table.ensure_header()?;
    let mut builder = SchemaBuilder::new(table.name(), previous, registry);
    for column in 0..table.column_count() {
        builder.append(
            table.header(FIELD_NAME_ROW, column),
            table.header(FIELD_TYPE_ROW, column),
            table.header(FIELD_COMMENT_ROW, column),
            column,
        )?;
    }
    let schema = builder.finish()?;
    debug!("Schema tree of '{}':\n{}", table.name(), schema.tree().dump());
    Ok(schema)
}

/// Renders and writes the proto file, compiles it, and persists the binding.
pub fn compile_schema(
    schema: &FinalizedSchema,
    config: &ExportConfig,
    paths: &ArtifactPaths,
    compiler: &dyn SchemaCompiler,
) -> Result<CompiledSchema> {
    let text = render_proto(schema, &paths.proto_file, &config.package);
    io_utils::write_output(&paths.proto, text)?;
    info!("Wrote {:?}", paths.proto);

    let pool = compiler
        .compile(
            &config.generated_include_paths(),
            std::slice::from_ref(&paths.proto_file),
        )
        .with_context(|| format!("Compiling {:?}", paths.proto))?;
    let record_name = config.message_name(schema.root_type());
    let record = pool
        .get_message_by_name(&record_name)
        .ok_or_else(|| anyhow!("Compiled schema has no message {record_name}"))?;
    let container_name = config.message_name(&container_type_name(schema.root_type()));
    let container = pool
        .get_message_by_name(&container_name)
        .ok_or_else(|| anyhow!("Compiled schema has no message {container_name}"))?;

    io_utils::write_output(&paths.binding, pool.encode_to_vec())?;
    info!("Wrote {:?}", paths.binding);
    Ok(CompiledSchema {
        pool,
        record,
        container,
    })
}

/// Transcribes every data row into a new container message.
pub fn transcribe_rows(
    bound: &BoundSchema,
    table: &SheetTable,
    container: &MessageDescriptor,
) -> ConvertResult<DynamicMessage> {
    let items = container
        .get_field_by_name(CONTAINER_ITEMS_FIELD)
        .ok_or_else(|| {
            ConvertError::mismatch(
                CONTAINER_ITEMS_FIELD,
                format!("container {} has no items field", container.full_name()),
            )
        })?;
    let mut records = Vec::new();
    for (row_number, cells) in table.data_rows() {
        debug!("Transcribing row {row_number} of '{}'", table.name());
        let mut record = bound.new_record();
        bound.transcribe_row(&mut record, cells, row_number)?;
        records.push(Value::Message(record));
    }
    let mut message = DynamicMessage::new(container.clone());
    message.set_field(&items, Value::List(records));
    Ok(message)
}

/// The sheet's message from the previous run, used to keep field numbers
/// stable. Prefers the stored binding and falls back to compiling the
/// previously generated proto file. Unusable leftovers are skipped.
pub fn load_previous(
    config: &ExportConfig,
    paths: &ArtifactPaths,
    compiler: &dyn SchemaCompiler,
    sheet: &str,
) -> Option<MessageDescriptor> {
    let pool = if paths.binding.is_file() {
        read_previous(&paths.binding, || decode_descriptor_set(&paths.binding))
    } else if paths.proto.is_file() {
        read_previous(&paths.proto, || {
            compiler.compile(
                &config.generated_include_paths(),
                std::slice::from_ref(&paths.proto_file),
            )
        })
    } else {
        None
    }?;

    let name = config.message_name(sheet);
    match pool.get_message_by_name(&name) {
        Some(message) => {
            info!("Reusing field numbers of {name} from the previous export");
            Some(message)
        }
        None => {
            warn!("Previous schema for sheet '{sheet}' has no message {name}; numbering afresh");
            None
        }
    }
}

fn read_previous(
    path: &Path,
    load: impl FnOnce() -> ConvertResult<DescriptorPool>,
) -> Option<DescriptorPool> {
    match load() {
        Ok(pool) => {
            debug!("Loaded previous schema from {path:?}");
            Some(pool)
        }
        Err(err) => {
            warn!("Ignoring previous schema {path:?}: {err}");
            None
        }
    }
}
