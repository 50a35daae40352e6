use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use subscription_checkout::application::card_payment::CardPaymentWorkflow;
use subscription_checkout::application::gateway::GatewayClient;
use subscription_checkout::application::pix_payment::PixWorkflow;
use subscription_checkout::config::CheckoutConfig;
use subscription_checkout::domain::card::{CardForm, Field};
use subscription_checkout::domain::checkout::{CheckoutState, PaymentMethod};
use subscription_checkout::domain::pix::PixForm;
use subscription_checkout::domain::plan::{InstallmentCount, installment_options};
use subscription_checkout::domain::ports::{CheckoutWebhookRef, GatewayLoaderRef};
use subscription_checkout::error::CheckoutError;
use subscription_checkout::infrastructure::http::{HttpCheckoutWebhook, HttpGatewayLoader};
use subscription_checkout::interfaces::terminal::checkout_renderer::CheckoutRenderer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file (defaults to $CHECKOUT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the available plans
    Plans,
    /// Show the installment options for a plan
    Quote {
        #[arg(long)]
        plan: String,
    },
    /// Pay for a plan with a credit card
    Card(CardArgs),
    /// Generate a PIX charge for a plan
    Pix(PixArgs),
}

#[derive(Args)]
struct CustomerArgs {
    #[arg(long)]
    plan: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    cpf: String,
}

#[derive(Args)]
struct CardArgs {
    #[command(flatten)]
    customer: CustomerArgs,
    #[arg(long)]
    card_number: String,
    #[arg(long)]
    card_name: String,
    /// Card expiry as MM/YY
    #[arg(long)]
    expiry: String,
    #[arg(long)]
    cvv: String,
    /// Number of installments (1-12)
    #[arg(long)]
    installments: Option<u8>,
    /// How many times to retry loading the payment gateway
    #[arg(long, default_value_t = 0)]
    retries: u32,
}

#[derive(Args)]
struct PixArgs {
    #[command(flatten)]
    customer: CustomerArgs,
    #[arg(long)]
    phone: String,
    /// Follow the countdown until the code expires
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "subscription_checkout=info".into()),
        )
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = CheckoutConfig::load(cli.config.as_deref()).into_diagnostic()?;

    let stdout = io::stdout();
    let mut renderer = CheckoutRenderer::new(stdout.lock());

    match cli.command {
        Command::Plans => {
            renderer.write_plans(&config.plans).into_diagnostic()?;
        }
        Command::Quote { plan } => {
            let plan = config.plans.require(&plan).into_diagnostic()?;
            renderer.write_plan(plan).into_diagnostic()?;
            renderer
                .write_installment_options(&installment_options(plan, config.installments.max))
                .into_diagnostic()?;
        }
        Command::Card(args) => pay_with_card(&config, args, &mut renderer).await?,
        Command::Pix(args) => pay_with_pix(&config, args, &mut renderer).await?,
    }

    renderer.flush().into_diagnostic()
}

/// Walks the state machine to the payment step for `method`.
fn enter_payment_step(
    config: &CheckoutConfig,
    plan_id: &str,
    method: PaymentMethod,
    renderer: &mut CheckoutRenderer<impl Write>,
) -> Result<CheckoutState> {
    let plan = config.plans.require(plan_id).into_diagnostic()?.clone();
    let mut state = CheckoutState::new();
    state.select_plan(plan).into_diagnostic()?;
    state.select_payment_method(method).into_diagnostic()?;
    renderer.write_step(&state).into_diagnostic()?;
    Ok(state)
}

fn webhook(config: &CheckoutConfig) -> Result<CheckoutWebhookRef> {
    Ok(Arc::new(
        HttpCheckoutWebhook::new(config.webhooks.clone()).into_diagnostic()?,
    ))
}

async fn pay_with_card(
    config: &CheckoutConfig,
    args: CardArgs,
    renderer: &mut CheckoutRenderer<impl Write>,
) -> Result<()> {
    let state = enter_payment_step(
        config,
        &args.customer.plan,
        PaymentMethod::CreditCard,
        renderer,
    )?;

    let loader: GatewayLoaderRef =
        Arc::new(HttpGatewayLoader::new(&config.gateway).into_diagnostic()?);
    let gateway = Arc::new(GatewayClient::new(config.gateway.clone(), loader));

    let mut loaded = gateway.load().await;
    while loaded.is_err() && gateway.status().await.retry_count < args.retries {
        renderer
            .write_gateway_status(&gateway.status().await)
            .into_diagnostic()?;
        loaded = gateway.retry().await;
    }
    renderer
        .write_gateway_status(&gateway.status().await)
        .into_diagnostic()?;
    loaded.into_diagnostic()?;

    let installments = match args.installments {
        Some(count) => InstallmentCount::new(count).into_diagnostic()?,
        None => config.installments.default,
    };
    let mut form = CardForm::new(installments);
    form.set(Field::Name, &args.customer.name);
    form.set(Field::Email, &args.customer.email);
    form.set(Field::TaxId, &args.customer.cpf);
    form.set(Field::CardNumber, &args.card_number);
    form.set(Field::CardHolder, &args.card_name);
    form.set(Field::Expiry, &args.expiry);
    form.set(Field::Cvv, &args.cvv);

    let workflow =
        CardPaymentWorkflow::new(gateway, webhook(config)?, config.plan_mapping.clone());
    let plan = state.plan_for(PaymentMethod::CreditCard).into_diagnostic()?;

    match workflow.submit(plan, &mut form).await {
        Ok(receipt) => renderer.write_receipt(&receipt).into_diagnostic(),
        Err(CheckoutError::Validation(errors)) => {
            renderer.write_field_errors(&errors).into_diagnostic()?;
            Err(CheckoutError::Validation(errors)).into_diagnostic()
        }
        Err(err) => Err(err).into_diagnostic(),
    }
}

async fn pay_with_pix(
    config: &CheckoutConfig,
    args: PixArgs,
    renderer: &mut CheckoutRenderer<impl Write>,
) -> Result<()> {
    let state = enter_payment_step(config, &args.customer.plan, PaymentMethod::Pix, renderer)?;
    let plan = state.plan_for(PaymentMethod::Pix).into_diagnostic()?;

    let form = PixForm {
        name: args.customer.name,
        email: args.customer.email,
        phone: args.phone,
        tax_id: args.customer.cpf,
    };

    let workflow = PixWorkflow::new(
        webhook(config)?,
        config.plan_mapping.clone(),
        config.pix.clone(),
    );
    let mut session = match workflow.generate(plan, &form).await {
        Ok(session) => session,
        Err(CheckoutError::Validation(errors)) => {
            renderer.write_field_errors(&errors).into_diagnostic()?;
            return Err(CheckoutError::Validation(errors)).into_diagnostic();
        }
        Err(err) => return Err(err).into_diagnostic(),
    };
    renderer.write_pix_session(&session).into_diagnostic()?;

    if args.watch {
        loop {
            renderer.flush().into_diagnostic()?;
            let finished = tokio::select! {
                _ = session.expired() => true,
                _ = tokio::time::sleep(Duration::from_secs(60)) => false,
            };
            renderer
                .write_pix_status(session.status())
                .into_diagnostic()?;
            if finished {
                break;
            }
        }
    }

    session.stop();
    Ok(())
}
