//! Plain-text rendering of catalog state for the terminal.

use client_core::{BrowsingMode, CatalogSnapshot};
use shared::domain::{Category, Product, UserProfile};

const DESCRIPTION_PREVIEW_CHARS: usize = 100;

/// `1234.5` -> `1 234.50 ₽`.
pub fn format_price(price: f64) -> String {
    let cents = (price * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}.{:02} ₽", cents % 100)
}

pub fn preview(description: &str) -> String {
    if description.chars().count() > DESCRIPTION_PREVIEW_CHARS {
        let cut: String = description.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        description.to_string()
    }
}

pub fn product_line(product: &Product) -> String {
    let mut line = format!(
        "#{:<5} {} [{}] {}",
        product.id.0,
        product.name,
        product.category,
        format_price(product.price)
    );
    if let Some(rating) = product.rating {
        line.push_str(&format!(" ★{rating:.1}"));
    }
    if !product.in_stock {
        line.push_str(" (out of stock)");
    }
    line
}

pub fn product_details(product: &Product) -> String {
    let mut out = product_line(product);
    if let Some(description) = &product.description {
        out.push_str("\n    ");
        out.push_str(&preview(description));
    }
    out.push_str("\n    image: ");
    out.push_str(product.image_or_placeholder());
    out
}

pub fn heading(mode: &BrowsingMode) -> String {
    match mode {
        BrowsingMode::All => "All products".to_string(),
        BrowsingMode::Category(name) => format!("Category: {name}"),
        BrowsingMode::Search(query) => format!("Search results: \"{query}\""),
    }
}

pub fn catalog_page(snapshot: &CatalogSnapshot) -> String {
    let mut out = heading(&snapshot.mode);
    let pagination = snapshot.pagination;
    if pagination.total() > 0 {
        out.push_str(&format!(" ({} found)", pagination.total()));
    }
    out.push('\n');

    if snapshot.products.is_empty() {
        out.push_str("  no products found\n");
        return out;
    }
    for product in &snapshot.products {
        out.push_str("  ");
        out.push_str(&product_line(product));
        out.push('\n');
    }
    if pagination.total_pages() > 1 {
        out.push_str(&format!(
            "  page {} of {}\n",
            pagination.page(),
            pagination.total_pages()
        ));
    }
    out
}

pub fn category_list(categories: &[Category]) -> String {
    categories
        .iter()
        .map(|c| match &c.description {
            Some(description) => format!("{} - {description}", c.name),
            None => c.name.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn user_summary(user: &UserProfile) -> String {
    let mut out = format!(
        "{} {} <{}> (id {})",
        user.first_name, user.last_name, user.email, user.id
    );
    if !user.phone.is_empty() {
        out.push_str(&format!(", phone {}", user.phone));
    }
    if let Some(provider) = user.auth_provider {
        out.push_str(&format!(", via {provider:?}"));
    }
    out
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
