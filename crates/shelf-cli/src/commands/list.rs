use std::path::Path;

use chrono::Utc;

use crate::commands::common::{
    format_product_lines, open_database, product_to_list_item, ProductListItem,
};
use crate::error::CliError;

pub async fn run_list(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let products = db.list_products(limit, 0).await?;
    let now = Utc::now();

    if as_json {
        let json_items = products
            .iter()
            .map(|product| product_to_list_item(product, now))
            .collect::<Vec<ProductListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if products.is_empty() {
        println!("No products stored yet.");
    } else {
        for line in format_product_lines(&products, now) {
            println!("{line}");
        }
    }

    Ok(())
}
