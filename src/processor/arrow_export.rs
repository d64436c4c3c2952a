use arrow2::{
    array::{Array, MutableUtf8Array, PrimitiveArray, UInt64Array, Utf8Array},
    chunk::Chunk,
    datatypes::{DataType, Field, Schema},
};
use std::sync::Arc;

use crate::processor::{ProcessorError, TopSeller};

/// Widest decimal arrow can hold in 128 bits
const DECIMAL_PRECISION: usize = 38;

/// Converts top-seller rows into an arrow2 schema and column chunk.
///
/// `total_sales` becomes `Decimal(38, s)` where `s` is the largest scale
/// among the rows, so no digits are lost.
pub fn top_sellers_to_arrow(
    rows: &[TopSeller],
) -> Result<(Schema, Chunk<Arc<dyn Array>>), ProcessorError> {
    let scale = rows
        .iter()
        .map(|r| r.total_sales.scale())
        .max()
        .unwrap_or(0);

    let schema = Schema::from(vec![
        Field::new("retailer_id", DataType::UInt64, false),
        Field::new("category", DataType::Utf8, false),
        Field::new("product_id", DataType::UInt64, false),
        Field::new("name", DataType::Utf8, false),
        Field::new(
            "total_sales",
            DataType::Decimal(DECIMAL_PRECISION, scale as usize),
            false,
        ),
    ]);

    let retailer_ids = UInt64Array::from_vec(rows.iter().map(|r| r.retailer_id).collect());
    let product_ids = UInt64Array::from_vec(rows.iter().map(|r| r.product_id).collect());

    let mut categories = MutableUtf8Array::<i32>::with_capacity(rows.len());
    let mut names = MutableUtf8Array::<i32>::with_capacity(rows.len());
    for r in rows {
        categories.push(Some(r.category.as_str()));
        names.push(Some(r.name.as_str()));
    }
    let categories: Utf8Array<i32> = categories.into();
    let names: Utf8Array<i32> = names.into();

    let mut mantissas = Vec::with_capacity(rows.len());
    for r in rows {
        let mut value = r.total_sales;
        value.rescale(scale);
        if value.scale() != scale {
            return Err(ProcessorError::Parse(format!(
                "total {} does not fit scale {}",
                r.total_sales, scale
            )));
        }
        mantissas.push(value.mantissa());
    }
    let totals = PrimitiveArray::<i128>::from_vec(mantissas)
        .to(DataType::Decimal(DECIMAL_PRECISION, scale as usize));

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(retailer_ids),
        Arc::new(categories),
        Arc::new(product_ids),
        Arc::new(names),
        Arc::new(totals),
    ];
    let chunk = Chunk::try_new(arrays).map_err(|e| ProcessorError::Parse(e.to_string()))?;

    Ok((schema, chunk))
}
