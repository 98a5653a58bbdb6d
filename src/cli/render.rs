//! Table output

use std::io::{self, Write};

use rust_decimal::Decimal;
use rusty_money::{Money, iso};
use storefront::{
    cart::CartLineItem,
    checkout::{CartReview, CheckoutTotals, PlacedCheckout},
    products::Product,
    stock::{StockStatus, resolve_stock},
    variants::{VariantSelection, default_selection},
};
use tabled::{
    Table,
    builder::Builder,
    settings::{
        Alignment, Style,
        object::{Columns, Rows},
    },
};

pub(super) fn money(amount: Decimal) -> String {
    Money::from_decimal(amount, iso::INR).to_string()
}

fn finish(builder: Builder, numeric_from: usize) -> Table {
    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Columns::new(numeric_from..), Alignment::right());
    table.modify(Rows::first(), Alignment::left());

    table
}

pub(super) fn stock(
    out: &mut impl Write,
    product: &Product,
    selector: Option<&VariantSelection>,
    status: &StockStatus,
) -> io::Result<()> {
    writeln!(out, "{} ({})  {}", product.name, product.id, money(product.price))?;

    if !product.category.is_empty() {
        writeln!(out, "category: {}", product.category_segments().join(" > "))?;
    }

    if product.has_variations {
        let default = default_selection(product);
        let mut builder = Builder::default();

        builder.push_record(["", "Variant", "Stock", "Level"]);

        for (selection, _) in product.variants() {
            let resolved = resolve_stock(product, Some(&selection));
            let marker = if default.as_ref() == Some(&selection) { "*" } else { "" };

            builder.push_record([
                marker.to_string(),
                selection.to_string(),
                resolved.available.to_string(),
                resolved.level.as_str().to_string(),
            ]);
        }

        writeln!(out, "{}", finish(builder, 2))?;
    }

    let label = selector.map_or_else(|| "-".to_string(), ToString::to_string);

    writeln!(
        out,
        "{label}: {} available ({}), up to {} per order",
        status.available,
        status.level.as_str(),
        status.max_quantity()
    )
}

pub(super) fn cart(out: &mut impl Write, items: &[CartLineItem]) -> io::Result<()> {
    if items.is_empty() {
        return writeln!(out, "cart is empty");
    }

    let mut builder = Builder::default();

    builder.push_record(["Key", "Item", "Variant", "Unit Price", "Qty", "Stock", "Line Total"]);

    for item in items {
        builder.push_record([
            item.identity().to_string(),
            item.name.clone(),
            item.variant_selection.to_string(),
            money(item.unit_price),
            item.quantity.to_string(),
            item.available_stock.to_string(),
            money(item.line_total()),
        ]);
    }

    writeln!(out, "{}", finish(builder, 3))
}

pub(super) fn totals(out: &mut impl Write, totals: &CheckoutTotals) -> io::Result<()> {
    let mut builder = Builder::default();

    builder.push_record(["", "Amount"]);
    builder.push_record(["Items".to_string(), money(totals.items_total)]);
    builder.push_record(["Shipping".to_string(), money(totals.shipping)]);
    builder.push_record(["Tax".to_string(), money(totals.tax)]);
    builder.push_record(["Total".to_string(), money(totals.grand_total)]);

    writeln!(out, "{}", finish(builder, 1))
}

pub(super) fn review(out: &mut impl Write, review: &CartReview) -> io::Result<()> {
    let mut builder = Builder::default();

    builder.push_record(["Key", "Qty", "Live Stock", "Level", "Price", "Status"]);

    for line in &review.lines {
        let status = if line.needs_reconfirmation() {
            "reconfirm quantity"
        } else if line.price_changed() {
            "price changed"
        } else {
            "ok"
        };

        let price = if line.price_changed() {
            format!("{} -> {}", money(line.cart_price), money(line.live_price))
        } else {
            money(line.live_price)
        };

        builder.push_record([
            line.key.to_string(),
            line.requested.to_string(),
            line.live.available.to_string(),
            line.live.level.as_str().to_string(),
            price,
            status.to_string(),
        ]);
    }

    writeln!(out, "{}", finish(builder, 1))
}

pub(super) fn order(out: &mut impl Write, placed: &PlacedCheckout) -> io::Result<()> {
    cart_lines_of(out, placed)?;
    totals(out, placed.draft.totals())?;

    writeln!(out, "order:   {}", placed.order.uuid)?;
    writeln!(out, "method:  {}", placed.order.payment_method)?;
    writeln!(out, "payment: {}", placed.payment.state())?;

    if !placed.cart_cleared {
        writeln!(out, "warning: the cart could not be cleared")?;
    }

    Ok(())
}

fn cart_lines_of(out: &mut impl Write, placed: &PlacedCheckout) -> io::Result<()> {
    let mut builder = Builder::default();

    builder.push_record(["Item", "Variant", "Unit Price", "Qty", "Line Total"]);

    for line in placed.draft.items() {
        builder.push_record([
            line.name.clone(),
            line.variant_selection.to_string(),
            money(line.unit_price),
            line.quantity.to_string(),
            money(line.line_total()),
        ]);
    }

    writeln!(out, "{}", finish(builder, 2))
}
