//! Storefront CLI commands

use std::{io::Write, sync::Arc};

use clap::{Args, Parser, Subcommand};
use jiff::Timestamp;
use storefront::{
    cart::{CartStore, FileStorage},
    catalog::InMemoryCatalog,
    checkout::{CheckoutPolicy, CheckoutService, ShippingAddress, compute_totals_with},
    config::StorefrontConfig,
    orders::{InMemoryOrderService, OrderService},
    payments::{ConfirmationStatus, PayerIdentity, PaymentConfirmation, PaymentMethod},
    products::ProductId,
    variants::VariantSelection,
};

mod render;

#[derive(Debug, Parser)]
#[command(name = "storefront", about = "Variant-aware storefront cart", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) config: StorefrontConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show stock for a product or one of its variants
    Stock(StockArgs),

    /// Add a product to the cart; re-adding a variant replaces its quantity
    Add(AddArgs),

    /// Set the quantity of a cart line
    Update(UpdateArgs),

    /// Remove a cart line by key (or product id for keyless lines)
    Remove(RemoveArgs),

    /// Empty the cart
    Clear,

    /// List cart lines
    List,

    /// Show checkout totals for the cart
    Totals,

    /// Re-check every cart line against live catalog stock
    Review,

    /// Place an order against a simulated order service
    Checkout(CheckoutArgs),
}

#[derive(Debug, Args)]
struct VariantArgs {
    /// UK footwear size
    #[arg(long, requires = "us", conflicts_with = "model")]
    uk: Option<String>,

    /// US footwear size
    #[arg(long, requires = "uk")]
    us: Option<String>,

    /// Phone model
    #[arg(long, requires_all = ["storage", "ram"])]
    model: Option<String>,

    /// Phone storage, e.g. 256GB
    #[arg(long, requires = "model")]
    storage: Option<String>,

    /// Phone RAM, e.g. 12GB
    #[arg(long, requires = "model")]
    ram: Option<String>,
}

impl VariantArgs {
    fn selection(self) -> VariantSelection {
        match self {
            Self {
                uk: Some(uk),
                us: Some(us),
                ..
            } => VariantSelection::footwear(uk, us),
            Self {
                model: Some(model),
                storage: Some(storage),
                ram: Some(ram),
                ..
            } => VariantSelection::phone(model, storage, ram),
            _ => VariantSelection::None,
        }
    }
}

#[derive(Debug, Args)]
struct StockArgs {
    /// Product id
    product: String,

    #[command(flatten)]
    variant: VariantArgs,
}

#[derive(Debug, Args)]
struct AddArgs {
    /// Product id
    product: String,

    /// Units to add
    #[arg(short, long, default_value_t = 1)]
    quantity: u32,

    #[command(flatten)]
    variant: VariantArgs,
}

#[derive(Debug, Args)]
struct UpdateArgs {
    /// Cart line key
    key: String,

    /// New quantity
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    quantity: u32,
}

#[derive(Debug, Args)]
struct RemoveArgs {
    /// Cart line key
    key: String,
}

#[derive(Debug, Args)]
struct CheckoutArgs {
    /// Recipient name
    #[arg(long, default_value = "")]
    full_name: String,

    /// Street address
    #[arg(long, default_value = "")]
    address_line: String,

    /// City
    #[arg(long, default_value = "")]
    city: String,

    /// PIN code
    #[arg(long, default_value = "")]
    pin_code: String,

    /// Contact phone
    #[arg(long, default_value = "")]
    phone: String,

    /// Payment method (card, paypal, upi, cod)
    #[arg(long, default_value = "cod")]
    method: PaymentMethod,

    /// Simulate a provider confirmation with this transaction id
    #[arg(long)]
    transaction_id: Option<String>,
}

impl CheckoutArgs {
    fn address(&self) -> ShippingAddress {
        ShippingAddress {
            full_name: self.full_name.clone(),
            address_line: self.address_line.clone(),
            city: self.city.clone(),
            pin_code: self.pin_code.clone(),
            phone: self.phone.clone(),
        }
    }
}

struct Context {
    config: StorefrontConfig,
}

impl Context {
    fn cart(&self) -> Result<CartStore, String> {
        let storage = FileStorage::new(self.config.storage.cart_dir.clone());

        CartStore::open(Arc::new(storage)).map_err(|error| format!("failed to open cart: {error}"))
    }

    fn catalog(&self) -> Result<Arc<InMemoryCatalog>, String> {
        let path = &self.config.storage.catalog_path;

        InMemoryCatalog::load(path)
            .map(Arc::new)
            .map_err(|error| format!("failed to load catalog {}: {error}", path.display()))
    }

    fn policy(&self) -> CheckoutPolicy {
        CheckoutPolicy::from(&self.config.checkout)
    }

    fn checkout(
        &self,
        catalog: Arc<InMemoryCatalog>,
        orders: Arc<dyn OrderService>,
    ) -> CheckoutService {
        CheckoutService::new(catalog, orders)
            .with_policy(self.policy())
            .with_timeout(self.config.service.timeout())
    }
}

fn output(error: std::io::Error) -> String {
    format!("failed to write output: {error}")
}

impl Cli {
    /// Load configuration from environment and CLI arguments
    pub(crate) fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    pub(crate) async fn run(self, out: &mut impl Write) -> Result<(), String> {
        let context = Context {
            config: self.config,
        };

        match self.command {
            Commands::Stock(args) => stock(&context, args, out).await,
            Commands::Add(args) => add(&context, args, out).await,
            Commands::Update(args) => update(&context, &args, out),
            Commands::Remove(args) => remove(&context, &args, out),
            Commands::Clear => clear(&context, out),
            Commands::List => render::cart(out, context.cart()?.list_items()).map_err(output),
            Commands::Totals => {
                let cart = context.cart()?;

                render::totals(out, &compute_totals_with(cart.list_items(), &context.policy()))
                    .map_err(output)
            }
            Commands::Review => review(&context, out).await,
            Commands::Checkout(args) => checkout(&context, args, out).await,
        }
    }
}

async fn stock(context: &Context, args: StockArgs, out: &mut impl Write) -> Result<(), String> {
    let service = context.checkout(context.catalog()?, Arc::new(InMemoryOrderService::new()));
    let selection = args.variant.selection();
    let selector = (!selection.is_none()).then_some(&selection);

    let (product, status) = service
        .resolve_product_stock(&ProductId::new(args.product), selector)
        .await
        .map_err(|error| error.to_string())?;

    render::stock(out, &product, selector, &status).map_err(output)
}

async fn add(context: &Context, args: AddArgs, out: &mut impl Write) -> Result<(), String> {
    let service = context.checkout(context.catalog()?, Arc::new(InMemoryOrderService::new()));
    let mut cart = context.cart()?;

    let key = service
        .add_to_cart(
            &mut cart,
            &ProductId::new(args.product),
            args.quantity,
            args.variant.selection(),
        )
        .await
        .map_err(|error| error.to_string())?;

    writeln!(out, "{key}: quantity {}", args.quantity).map_err(output)?;

    render::cart(out, cart.list_items()).map_err(output)
}

fn update(context: &Context, args: &UpdateArgs, out: &mut impl Write) -> Result<(), String> {
    let mut cart = context.cart()?;

    cart.update_quantity(&args.key, args.quantity)
        .map_err(|error| error.to_string())?;

    render::cart(out, cart.list_items()).map_err(output)
}

fn remove(context: &Context, args: &RemoveArgs, out: &mut impl Write) -> Result<(), String> {
    let mut cart = context.cart()?;

    let removed = cart
        .remove_item(&args.key)
        .map_err(|error| error.to_string())?;

    if !removed {
        return Err(format!("no cart line {}", args.key));
    }

    render::cart(out, cart.list_items()).map_err(output)
}

fn clear(context: &Context, out: &mut impl Write) -> Result<(), String> {
    context
        .cart()?
        .clear()
        .map_err(|error| error.to_string())?;

    writeln!(out, "cart cleared").map_err(output)
}

async fn review(context: &Context, out: &mut impl Write) -> Result<(), String> {
    let service = context.checkout(context.catalog()?, Arc::new(InMemoryOrderService::new()));
    let mut cart = context.cart()?;

    let review = service
        .review(&mut cart)
        .await
        .map_err(|error| error.to_string())?;

    render::review(out, &review).map_err(output)
}

async fn checkout(context: &Context, args: CheckoutArgs, out: &mut impl Write) -> Result<(), String> {
    let catalog = context.catalog()?;
    let orders = Arc::new(InMemoryOrderService::from_catalog(&catalog));
    let service = context.checkout(catalog, orders);
    let mut cart = context.cart()?;

    let review = service
        .review(&mut cart)
        .await
        .map_err(|error| error.to_string())?;

    if !review.is_ready() {
        render::review(out, &review).map_err(output)?;

        return Err("some lines exceed live stock; update them before checking out".to_string());
    }

    let address = args.address();

    let mut placed = service
        .place_order(&mut cart, &address, args.method)
        .await
        .map_err(|error| error.to_string())?;

    render::order(out, &placed).map_err(output)?;

    if let Some(transaction_id) = args.transaction_id {
        let confirmation = PaymentConfirmation {
            transaction_id,
            status: ConfirmationStatus::Completed,
            timestamp: Timestamp::now(),
            payer: PayerIdentity {
                payer_id: address.full_name.clone(),
                email: None,
            },
        };

        service
            .confirm_payment(placed.order.uuid, &mut placed.payment, &confirmation)
            .await
            .map_err(|error| error.to_string())?;

        writeln!(out, "payment: {}", placed.payment.state()).map_err(output)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn footwear_flags_build_a_footwear_selection() -> TestResult {
        let cli = Cli::try_parse_from(["storefront", "add", "shoe", "--uk", "9", "--us", "10", "-q", "2"])?;

        let Commands::Add(args) = cli.command else {
            return Err("expected add".into());
        };

        assert_eq!(args.quantity, 2);
        assert_eq!(args.variant.selection(), VariantSelection::footwear("9", "10"));

        Ok(())
    }

    #[test]
    fn half_a_footwear_size_is_rejected() {
        assert!(Cli::try_parse_from(["storefront", "add", "shoe", "--uk", "9"]).is_err());
    }

    #[test]
    fn update_rejects_zero_quantity() {
        assert!(Cli::try_parse_from(["storefront", "update", "socks", "0"]).is_err());
    }

    #[test]
    fn checkout_parses_payment_method() -> TestResult {
        let cli = Cli::try_parse_from(["storefront", "checkout", "--method", "upi"])?;

        let Commands::Checkout(args) = cli.command else {
            return Err("expected checkout".into());
        };

        assert_eq!(args.method, PaymentMethod::Upi);

        Ok(())
    }

    #[tokio::test]
    async fn add_list_and_totals_round_trip_through_files() -> TestResult {
        let dir = tempfile::tempdir()?;
        let catalog = dir.path().join("catalog.yml");
        let carts = dir.path().join("carts");

        std::fs::write(
            &catalog,
            r#"
products:
  - id: socks
    name: Wool Socks
    price: "250"
    countInStock: 4
"#,
        )?;

        let run = |args: &[&str]| {
            let mut argv = vec![
                "storefront".to_string(),
                "--catalog-path".to_string(),
                catalog.display().to_string(),
                "--cart-dir".to_string(),
                carts.display().to_string(),
            ];
            argv.extend(args.iter().map(ToString::to_string));
            Cli::try_parse_from(argv)
        };

        let mut out = Vec::new();

        run(&["add", "socks", "-q", "3"])?.run(&mut out).await?;
        run(&["totals"])?.run(&mut out).await?;

        let reopened = CartStore::open(Arc::new(FileStorage::new(carts.clone())))?;

        assert_eq!(reopened.item_count(), 3);

        let over = run(&["add", "socks", "-q", "5"])?.run(&mut out).await;

        assert!(over.is_err());

        Ok(())
    }
}
