use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    validation::{PasswordChangeForm, ProfileForm, RegisterForm},
    CatalogApi, CatalogCoordinator, Completion, MemoryTokenStore, SessionClient, StorefrontClient,
};
use shared::domain::{OAuthProvider, ProductId};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod browse;
mod config;
mod render;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(name = "storefront", about = "Browse the catalog and manage your account")]
struct Cli {
    /// Backend base URL; overrides storefront.toml and the environment.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Bearer token for account commands.
    #[arg(long, global = true)]
    token: Option<String>,
    #[arg(long, global = true)]
    page_size: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all products.
    Products {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List products in a category.
    Category {
        name: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Full-text search.
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Featured,
    Categories,
    Product {
        id: i64,
    },
    /// Interactive catalog browser.
    Browse,
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, default_value = "")]
        phone: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Profile,
    UpdateProfile {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, default_value = "")]
        phone: String,
    },
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    DeleteAccount {
        /// Required; the account cannot be restored.
        #[arg(long)]
        yes: bool,
    },
    /// Print the provider sign-in URL.
    OauthUrl {
        provider: OAuthProvider,
    },
    /// Print the URL that links a provider to the signed-in account.
    OauthLinkUrl {
        provider: OAuthProvider,
    },
    Link {
        provider: OAuthProvider,
        #[arg(long)]
        code: String,
        #[arg(long)]
        state: String,
    },
    Unlink {
        provider: OAuthProvider,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut settings, rejected) = load_settings()?;
    if let Some(url) = cli.api_url.clone() {
        settings.api_base_url = url;
    }
    if let Some(page_size) = cli.page_size.filter(|v| *v > 0) {
        settings.page_size = page_size;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    for setting in &rejected {
        setting.log();
    }

    let tokens = Arc::new(match cli.token.clone() {
        Some(token) => MemoryTokenStore::with_token(token),
        None => MemoryTokenStore::new(),
    });
    let api = StorefrontClient::with_timeout(
        &settings.api_base_url,
        tokens,
        Duration::from_secs(settings.request_timeout_secs),
    )
    .with_context(|| format!("invalid api url '{}'", settings.api_base_url))?;
    info!(api = %api.base_url(), "storefront client ready");

    let coordinator = CatalogCoordinator::new(Arc::new(api.clone()), settings.page_size)
        .with_featured_limit(settings.featured_limit);
    let session = SessionClient::new(api.clone());

    match cli.command {
        Command::Products { page } => {
            show_page(&coordinator, coordinator.refresh(), page).await;
        }
        Command::Category { name, page } => {
            if name.trim().is_empty() {
                bail!("category name must not be empty");
            }
            show_page(&coordinator, coordinator.select_category(&name), page).await;
        }
        Command::Search { query, page } => {
            show_page(&coordinator, coordinator.search(&query), page).await;
        }
        Command::Featured => {
            coordinator.load_bootstrap().await;
            for product in coordinator.snapshot().featured {
                println!("{}", render::product_line(&product));
            }
        }
        Command::Categories => {
            coordinator.load_bootstrap().await;
            println!("{}", render::category_list(&coordinator.snapshot().categories));
        }
        Command::Product { id } => {
            let product = api.product(ProductId(id)).await?;
            println!("{}", render::product_details(&product));
        }
        Command::Browse => {
            let stdin = BufReader::new(tokio::io::stdin());
            browse::browse(Arc::new(coordinator), stdin).await?
        }
        Command::Register {
            email,
            password,
            first_name,
            last_name,
            phone,
        } => {
            let user = session
                .register(&RegisterForm {
                    email,
                    confirm_password: password.clone(),
                    password,
                    first_name,
                    last_name,
                    phone,
                })
                .await?;
            println!("registered {}", render::user_summary(&user));
            print_token(&api);
        }
        Command::Login { email, password } => {
            let user = session.login(&email, &password).await?;
            println!("signed in as {}", render::user_summary(&user));
            print_token(&api);
        }
        Command::Logout => {
            session.logout().await?;
            println!("signed out");
        }
        Command::Profile => {
            let user = session.profile().await?;
            println!("{}", render::user_summary(&user));
        }
        Command::UpdateProfile {
            first_name,
            last_name,
            phone,
        } => {
            let message = session
                .update_profile(&ProfileForm {
                    first_name,
                    last_name,
                    phone,
                })
                .await?;
            println!("{message}");
        }
        Command::ChangePassword { current, new } => {
            let message = session
                .change_password(&PasswordChangeForm {
                    current_password: current,
                    confirm_password: new.clone(),
                    new_password: new,
                })
                .await?;
            println!("{message}");
        }
        Command::DeleteAccount { yes } => {
            if !yes {
                bail!("refusing to delete the account without --yes");
            }
            session.delete_account().await?;
            println!("account deleted");
        }
        Command::OauthUrl { provider } => {
            let auth = session.oauth_authorize_url(provider).await?;
            println!("{}", auth.auth_url);
        }
        Command::OauthLinkUrl { provider } => {
            println!("{}", session.oauth_link_redirect(provider)?);
        }
        Command::Link {
            provider,
            code,
            state,
        } => {
            println!("{}", session.link_account(provider, &code, &state).await?);
        }
        Command::Unlink { provider } => {
            println!("{}", session.unlink_account(provider).await?);
        }
    }

    Ok(())
}

fn print_token(api: &StorefrontClient) {
    if let Some(token) = api.tokens().current_token() {
        println!("token: {token}");
    }
}

async fn show_page(
    coordinator: &CatalogCoordinator,
    first: futures::future::BoxFuture<'static, Completion>,
    page: u32,
) {
    first.await;
    if page > 1 {
        coordinator.go_to_page(page).await;
    }
    print!("{}", render::catalog_page(&coordinator.snapshot()));
}
