//! Fixed-format CSV codecs for the admin console.
//!
//! Import format: `name,description,price,stock,category_id,image_url` per
//! line, first line skipped unconditionally, no quoting or comma escaping.
//! Export format for orders:
//! `id,customer_id,total,status,address_line1,city,state,postal_code,country,notes`.

use uuid::Uuid;

pub const ORDER_EXPORT_HEADER: &str =
    "id,customer_id,total,status,address_line1,city,state,postal_code,country,notes";

#[derive(Debug, PartialEq)]
pub struct ProductCsvRow {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
}

#[derive(Debug, PartialEq)]
pub struct RowError {
    /// 1-based line number in the uploaded file.
    pub line: usize,
    pub message: String,
}

/// Parse a bulk product upload. Malformed rows are reported individually and
/// do not block the rest of the batch.
pub fn parse_product_csv(input: &str) -> (Vec<ProductCsvRow>, Vec<RowError>) {
    let mut rows = Vec::new();
    let mut errors = Vec::new();

    for (idx, line) in input.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        match parse_product_line(line) {
            Ok(row) => rows.push(row),
            Err(message) => errors.push(RowError {
                line: idx + 1,
                message,
            }),
        }
    }

    (rows, errors)
}

fn parse_product_line(line: &str) -> Result<ProductCsvRow, String> {
    let mut fields = line.split(',').map(str::trim);

    let name = fields.next().unwrap_or_default();
    if name.is_empty() {
        return Err("name is required".into());
    }
    let description = fields.next().unwrap_or_default();
    let price = fields.next().unwrap_or_default();
    let stock = fields.next().unwrap_or_default();
    let category_id = fields.next().unwrap_or_default();
    let image_url = fields.next().unwrap_or_default();

    let price: f64 = price
        .parse()
        .map_err(|_| format!("invalid price {price:?}"))?;
    if !price.is_finite() || price < 0.0 {
        return Err(format!("invalid price {price:?}"));
    }

    let stock: i32 = stock
        .parse()
        .map_err(|_| format!("invalid stock {stock:?}"))?;
    if stock < 0 {
        return Err(format!("invalid stock {stock}"));
    }

    let category_id = if category_id.is_empty() {
        None
    } else {
        Some(
            category_id
                .parse::<Uuid>()
                .map_err(|_| format!("invalid category_id {category_id:?}"))?,
        )
    };

    Ok(ProductCsvRow {
        name: name.to_string(),
        description: non_empty(description),
        price,
        stock,
        category_id,
        image_url: non_empty(image_url),
    })
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct OrderExportRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub total: f64,
    pub status: String,
    pub address_line1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub notes: Option<String>,
}

pub fn render_order_csv(rows: &[OrderExportRow]) -> String {
    let mut out = String::from(ORDER_EXPORT_HEADER);
    for row in rows {
        out.push('\n');
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{}",
            row.id,
            row.customer_id,
            row.total,
            row.status,
            row.address_line1.as_deref().unwrap_or(""),
            row.city.as_deref().unwrap_or(""),
            row.state.as_deref().unwrap_or(""),
            row.postal_code.as_deref().unwrap_or(""),
            row.country.as_deref().unwrap_or(""),
            row.notes.as_deref().unwrap_or(""),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_line_is_skipped_unconditionally() {
        let input = "name,description,price,stock,category_id,image_url\nWidget,Nice,9.99,5,,";
        let (rows, errors) = parse_product_csv(input);
        assert!(errors.is_empty());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Widget");
        assert_eq!(rows[0].price, 9.99);
        assert_eq!(rows[0].stock, 5);
        assert_eq!(rows[0].category_id, None);
        assert_eq!(rows[0].image_url, None);
    }

    #[test]
    fn malformed_row_does_not_block_the_batch() {
        let input = "header\nWidget,,9.99,5,,\nBroken,,not-a-price,5,,\nGadget,,1.50,2,,";
        let (rows, errors) = parse_product_csv(input);
        assert_eq!(rows.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 3);
        assert!(errors[0].message.contains("price"));
    }

    #[test]
    fn negative_stock_and_missing_name_are_rejected() {
        let input = "header\n,,1.00,5,,\nWidget,,1.00,-2,,";
        let (rows, errors) = parse_product_csv(input);
        assert!(rows.is_empty());
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn category_id_parses_as_uuid() {
        let id = Uuid::new_v4();
        let input = format!("header\nWidget,desc,2.00,1,{id},/img.png");
        let (rows, errors) = parse_product_csv(&input);
        assert!(errors.is_empty());
        assert_eq!(rows[0].category_id, Some(id));
        assert_eq!(rows[0].image_url.as_deref(), Some("/img.png"));
    }

    #[test]
    fn order_export_renders_fixed_columns() {
        let row = OrderExportRow {
            id: Uuid::nil(),
            customer_id: Uuid::nil(),
            total: 25.5,
            status: "pending".into(),
            address_line1: Some("1 Main St".into()),
            city: Some("Manama".into()),
            state: Some("Capital".into()),
            postal_code: Some("317".into()),
            country: Some("BH".into()),
            notes: None,
        };
        let csv = render_order_csv(&[row]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(ORDER_EXPORT_HEADER));
        let line = lines.next().expect("data row");
        assert!(line.ends_with("25.5,pending,1 Main St,Manama,Capital,317,BH,"));
    }
}
