use arrow::{
    array::{Array, ArrayRef, BooleanArray, Float64Array, StringArray},
    compute::cast,
    datatypes::DataType,
    record_batch::RecordBatch,
};

const RELATIVE_TOLERANCE: f64 = 1e-5;
const ABSOLUTE_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Numeric,
    Text,
    Boolean,
    Other,
}

fn kind(dt: &DataType) -> Kind {
    match dt {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float16
        | DataType::Float32
        | DataType::Float64 => Kind::Numeric,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Kind::Text,
        DataType::Boolean => Kind::Boolean,
        _ => Kind::Other,
    }
}

/// First difference between two tables, or `None` when they are equal.
///
/// Numeric columns are compared by value regardless of physical width,
/// within `1e-5` relative / `1e-8` absolute tolerance.
pub fn first_difference(expected: &RecordBatch, actual: &RecordBatch) -> Option<String> {
    let exp_schema = expected.schema();
    let act_schema = actual.schema();
    let exp_names: Vec<&String> = exp_schema.fields().iter().map(|f| f.name()).collect();
    let act_names: Vec<&String> = act_schema.fields().iter().map(|f| f.name()).collect();
    if exp_names != act_names {
        return Some(format!("columns differ: {:?} vs {:?}", exp_names, act_names));
    }
    if expected.num_rows() != actual.num_rows() {
        return Some(format!(
            "row count differs: {} vs {}",
            expected.num_rows(),
            actual.num_rows()
        ));
    }

    for (i, name) in exp_names.iter().enumerate() {
        let (a, b) = (expected.column(i), actual.column(i));
        if let Some(diff) = column_difference(a, b) {
            return Some(format!("column `{}`: {}", name, diff));
        }
    }
    None
}

fn column_difference(a: &ArrayRef, b: &ArrayRef) -> Option<String> {
    let (ka, kb) = (kind(a.data_type()), kind(b.data_type()));
    if ka != kb {
        return Some(format!("type {} vs {}", a.data_type(), b.data_type()));
    }
    match ka {
        Kind::Numeric => {
            let (Some(a), Some(b)) = (as_f64(a), as_f64(b)) else {
                return Some("not comparable as numbers".into());
            };
            (0..a.len()).find_map(|r| match (a.is_null(r), b.is_null(r)) {
                (true, true) => None,
                (false, false) if close(a.value(r), b.value(r)) => None,
                _ => Some(format!(
                    "row {}: {} vs {}",
                    r,
                    display_f64(&a, r),
                    display_f64(&b, r)
                )),
            })
        }
        Kind::Text => {
            let (Some(a), Some(b)) = (as_utf8(a), as_utf8(b)) else {
                return Some("not comparable as text".into());
            };
            (0..a.len()).find_map(|r| {
                let (x, y) = (opt_str(&a, r), opt_str(&b, r));
                (x != y).then(|| format!("row {}: {:?} vs {:?}", r, x, y))
            })
        }
        Kind::Boolean => {
            let (Some(a), Some(b)) = (
                a.as_any().downcast_ref::<BooleanArray>(),
                b.as_any().downcast_ref::<BooleanArray>(),
            ) else {
                return Some("not comparable as booleans".into());
            };
            (0..a.len()).find_map(|r| {
                let x = (!a.is_null(r)).then(|| a.value(r));
                let y = (!b.is_null(r)).then(|| b.value(r));
                (x != y).then(|| format!("row {}: {:?} vs {:?}", r, x, y))
            })
        }
        Kind::Other => (a.to_data() != b.to_data()).then(|| "values differ".to_string()),
    }
}

fn close(a: f64, b: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    a == b || (a - b).abs() <= ABSOLUTE_TOLERANCE + RELATIVE_TOLERANCE * b.abs()
}

fn as_f64(arr: &ArrayRef) -> Option<Float64Array> {
    let casted = cast(arr.as_ref(), &DataType::Float64).ok()?;
    casted.as_any().downcast_ref::<Float64Array>().cloned()
}

fn as_utf8(arr: &ArrayRef) -> Option<StringArray> {
    let casted = cast(arr.as_ref(), &DataType::Utf8).ok()?;
    casted.as_any().downcast_ref::<StringArray>().cloned()
}

fn opt_str(arr: &StringArray, row: usize) -> Option<&str> {
    (!arr.is_null(row)).then(|| arr.value(row))
}

fn display_f64(arr: &Float64Array, row: usize) -> String {
    if arr.is_null(row) {
        "null".into()
    } else {
        arr.value(row).to_string()
    }
}
