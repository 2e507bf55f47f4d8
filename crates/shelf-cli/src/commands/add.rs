use std::path::Path;

use shelf_core::util::normalize_text_option;
use shelf_core::Product;

use crate::cli::AddArgs;
use crate::commands::common::{normalize_name, open_database};
use crate::error::CliError;

pub async fn run_add(args: AddArgs, db_path: &Path) -> Result<(), CliError> {
    let mut product = build_product(args)?;

    let db = open_database(db_path)?;
    db.save_product(&mut product).await?;

    println!("{}", product.key);
    Ok(())
}

pub fn build_product(args: AddArgs) -> Result<Product, CliError> {
    let name = normalize_name(&args.name)?;
    let mut product = match normalize_text_option(args.key) {
        Some(key) => Product::with_key(key, name)?,
        None => Product::new(name),
    };

    product.category = args.category.trim().to_string();
    product.sub_category = args.sub_category.trim().to_string();
    product.link = normalize_text_option(args.link);
    product.likes = args.likes;
    product.comments = args.comments;
    product.supplier_orders = args.supplier_orders;
    product.rating = args.rating;
    product.supplier_price = args.supplier_price;
    product.store_price = args.store_price;
    product.validate()?;

    Ok(product)
}
