use energysheets::{
    config::ColumnNames,
    process::{normalize, SheetSchema},
    source::Workbook,
};
use std::{env, path::Path, process::exit};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <XLSX_FILE>", args[0]);
        exit(1);
    }
    if let Err(e) = inspect_workbook(Path::new(&args[1])) {
        eprintln!("Error: {}", e);
        exit(1);
    }
}

/// List the sheets, then show the first one as read and after normalizing.
fn inspect_workbook(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut workbook = Workbook::open(path)?;
    let sheets = workbook.sheet_names().to_vec();
    println!("=== Workbook: {} ===", workbook.path().display());
    println!("Sheets ({}): {}", sheets.len(), sheets.join(", "));
    println!();

    let Some(first) = sheets.first() else {
        return Ok(());
    };
    let raw = workbook.load(first)?;
    println!("=== Sheet `{}` ===", first);
    println!("Columns: {}", raw.headers.join(" | "));
    println!("Rows:    {}", raw.num_rows());
    println!();

    let schema = SheetSchema::from_names(&ColumnNames::default());
    match normalize(&raw, &schema, first, workbook.file_name()) {
        Ok(table) => {
            println!("=== Normalized ===");
            let rows = table.to_raw().rows;
            for (i, (row, category)) in rows.iter().zip(table.categories()).enumerate() {
                let cells: Vec<String> = row
                    .iter()
                    .map(|c| c.as_text().unwrap_or_default())
                    .collect();
                println!(
                    "{:>4}  [{}]  {}",
                    i,
                    category.unwrap_or_else(|| "<none>".into()),
                    cells.join(" | ")
                );
            }
        }
        Err(e) => println!("Not a metering sheet: {}", e),
    }
    Ok(())
}
