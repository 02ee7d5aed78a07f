use arrow::util::pretty::print_batches;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::{env, fs::File, path::Path, process::exit};

fn main() {
    // Expect exactly one CLI argument: path to a cache entry.
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <CACHE_FILE>", args[0]);
        exit(1);
    }
    if let Err(e) = inspect_cache(Path::new(&args[1])) {
        eprintln!("Error: {}", e);
        exit(1);
    }
}

/// Print file metadata, the Arrow schema, then every cached row.
fn inspect_cache(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let reader = SerializedFileReader::new(File::open(path)?)?;
    let meta = reader.metadata();
    let file_meta = meta.file_metadata();

    println!("=== Cache entry: {} ===", path.display());
    println!(
        "Created by:           {}",
        file_meta.created_by().unwrap_or("<unknown>")
    );
    println!("Total rows:           {}", file_meta.num_rows());
    println!("Number of row groups: {}", meta.num_row_groups());
    println!("Size on disk:         {} bytes", std::fs::metadata(path)?.len());
    if let Some(rg) = (meta.num_row_groups() > 0).then(|| meta.row_group(0)) {
        if rg.num_columns() > 0 {
            println!("Compression:          {:?}", rg.column(0).compression());
        }
    }
    println!();

    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    println!("=== Schema ===");
    for field in builder.schema().fields() {
        println!(
            "- {:<20} | {:?}{}",
            field.name(),
            field.data_type(),
            if field.is_nullable() { " (nullable)" } else { "" }
        );
    }
    println!();

    println!("=== Rows ===");
    let batches = builder.build()?.collect::<Result<Vec<_>, _>>()?;
    print_batches(&batches)?;
    Ok(())
}
