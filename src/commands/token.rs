//! User and API token bootstrap
//!
//! Creates (or finds) a NetBox user with the configured admin token, then
//! issues a write-enabled API token for it and checks that it works.

use anyhow::{Context as _, Result};
use dialoguer::{Confirm, Input, Password};
use restkit::{Collection, Filter, Gateway, GatewayConfig, HttpGateway, Record};
use serde_json::{Value, json};

use crate::Context;
use crate::cli::TokenArgs;
use crate::config::Settings;
use crate::ui;

/// Details of the user to create
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: Option<String>,
}

impl NewUser {
    fn body(&self) -> Value {
        let mut body = json!({
            "username": self.username,
            "email": self.email,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "is_active": true,
            "is_staff": false,
            "is_superuser": false,
        });
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            body["password"] = json!(password);
        }
        body
    }
}

/// An issued API token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub user_id: u64,
    pub token_id: u64,
    pub key: String,
    pub description: String,
}

pub fn run(ctx: &Context, args: TokenArgs) -> Result<()> {
    let settings = super::settings(ctx)?;
    let gateway = super::connect(ctx, &settings)?;
    let url = settings.netbox.url.clone();

    ui::header("NetBox User and Token Setup");
    super::preflight(&gateway, &url, ctx.quiet)?;

    let user = prompt_user(&args)?;
    let token = issue(&gateway, &user)?;

    ui::section("Token");
    ui::kv("Username", &user.username);
    ui::kv("User ID", &token.user_id.to_string());
    ui::kv("Token ID", &token.token_id.to_string());
    ui::kv("Description", &token.description);
    ui::kv("API Token", &token.key);
    ui::warn("Save this token, it cannot be shown again");

    // Test with the new credential, not the admin one
    let mut config = settings.gateway_config(ctx.connection.retries)?;
    config.token.clone_from(&token.key);
    test_token(&config)?;

    println!();
    ui::dim(&format!(
        "curl -H 'Authorization: {}' {}/api/",
        config.auth_scheme.header_value(&token.key),
        url.trim_end_matches('/')
    ));

    let save = args.save
        || (!args.yes
            && Confirm::new()
                .with_prompt("Store this token in the config file?")
                .default(false)
                .interact()
                .context("Failed to read confirmation")?);
    if save {
        let path = super::config_path(ctx)?;
        Settings::set_token(&path, &url, &token.key)?;
        ui::success(&format!("Token saved to {}", path.display()));
    }

    Ok(())
}

/// Fill in user details from flags, prompting for the rest
fn prompt_user(args: &TokenArgs) -> Result<NewUser> {
    let username = match &args.username {
        Some(username) => username.clone(),
        None => Input::<String>::new()
            .with_prompt("Username")
            .interact_text()
            .context("Failed to read username")?,
    };
    let email = match &args.email {
        Some(email) => email.clone(),
        None => Input::<String>::new()
            .with_prompt("Email")
            .interact_text()
            .context("Failed to read email")?,
    };

    let optional = |value: &Option<String>, prompt: &str| -> Result<String> {
        match value {
            Some(value) => Ok(value.clone()),
            None if args.yes => Ok(String::new()),
            None => Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
                .with_context(|| format!("Failed to read {}", prompt.to_lowercase())),
        }
    };
    let first_name = optional(&args.first_name, "First name")?;
    let last_name = optional(&args.last_name, "Last name")?;

    let password = match &args.password {
        Some(password) => Some(password.clone()),
        None if args.yes => None,
        None => Some(
            Password::new()
                .with_prompt("Password (empty to leave unset)")
                .allow_empty_password(true)
                .interact()
                .context("Failed to read password")?,
        ),
    };

    let user = NewUser {
        username: username.trim().to_string(),
        email: email.trim().to_string(),
        first_name: first_name.trim().to_string(),
        last_name: last_name.trim().to_string(),
        password,
    };
    if user.username.is_empty() {
        anyhow::bail!("Username is required");
    }
    if user.email.is_empty() {
        anyhow::bail!("Email is required");
    }
    Ok(user)
}

/// Create or find the user, then create a token for it
pub fn issue<G: Gateway + ?Sized>(gateway: &G, user: &NewUser) -> Result<IssuedToken> {
    let user_record = create_or_find_user(gateway, user)?;
    let user_id = user_record
        .id()
        .with_context(|| format!("User '{}' has no id", user.username))?;

    let description = format!("API token for {}", user.username);
    log::info!("Creating API token for user '{}'", user.username);
    let token = gateway
        .create(
            Collection::Tokens,
            &json!({
                "user": user_id,
                "description": description,
                "write_enabled": true,
            }),
        )
        .context("Failed to create API token")?;

    let token_id = token.id().context("Created token has no id")?;
    let key = token
        .str_field("key")
        .context("Created token has no key")?
        .to_string();
    ui::success(&format!("API token created (ID: {})", token_id));

    Ok(IssuedToken {
        user_id,
        token_id,
        key,
        description,
    })
}

fn create_or_find_user<G: Gateway + ?Sized>(gateway: &G, user: &NewUser) -> Result<Record> {
    log::info!("Creating user '{}'", user.username);
    match gateway.create(Collection::Users, &user.body()) {
        Ok(record) => {
            ui::success(&format!(
                "User '{}' created (ID: {})",
                user.username,
                record.id().unwrap_or_default()
            ));
            Ok(record)
        }
        // 400 usually means the username is taken
        Err(e) if e.status_code() == Some(400) => {
            log::warn!(
                "User '{}' might already exist: {}",
                user.username,
                e.body().unwrap_or_default()
            );
            let found = gateway
                .query(
                    Collection::Users,
                    &Filter::new().eq("username", user.username.as_str()),
                )
                .context("Failed to look up existing user")?;
            let record = found
                .into_iter()
                .next()
                .with_context(|| format!("Failed to create or find user '{}'", user.username))?;
            ui::info(&format!(
                "Using existing user '{}' (ID: {})",
                user.username,
                record.id().unwrap_or_default()
            ));
            Ok(record)
        }
        Err(e) => Err(anyhow::Error::new(e))
            .with_context(|| format!("Failed to create user '{}'", user.username)),
    }
}

fn test_token(config: &GatewayConfig) -> Result<()> {
    let gateway = HttpGateway::new(config).context("Failed to set up the NetBox client")?;
    match gateway.ping() {
        Ok(()) => {
            ui::success("Token test successful");
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e)).context("Token test failed"),
    }
}
