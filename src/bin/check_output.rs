use energysheets::{
    aggregate::write::OUTPUT_SHEET,
    source::{read_sheet, sheet_names},
};
use std::{env, path::Path, process::exit};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <SUMMARY_XLSX>", args[0]);
        exit(1);
    }
    if let Err(e) = check_output(Path::new(&args[1])) {
        eprintln!("Error: {}", e);
        exit(1);
    }
}

/// Print the summary workbook as a text table.
fn check_output(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let sheets = sheet_names(path)?;
    let sheet = if sheets.iter().any(|s| s == OUTPUT_SHEET) {
        OUTPUT_SHEET.to_string()
    } else {
        sheets.first().cloned().ok_or("workbook has no sheets")?
    };
    let table = read_sheet(path, &sheet)?;

    println!("=== {} [{}] ===", path.display(), sheet);
    println!("Columns: {}", table.headers.len());
    println!("Rows:    {}", table.num_rows());
    println!();
    println!("{}", table.headers.join("\t"));
    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|c| c.as_text().unwrap_or_default())
            .collect();
        println!("{}", cells.join("\t"));
    }
    Ok(())
}
