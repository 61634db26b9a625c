//! Auth command handlers.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::DateTime;
use deployboard_core::auth::{CallbackHandler, Claims};
use deployboard_core::jobs::status::format_timestamp;
use deployboard_core::logging::mask_token;
use url::Url;

use crate::cli::context::App;

pub async fn login(app: &App) -> Result<()> {
    if let Some(credential) = app.session.credential()
        && credential.is_valid()
    {
        println!(
            "Already signed in as {} (token: {})",
            display_name(&credential.claims),
            mask_token(&credential.id_token)
        );
        print!("Sign in again? [y/N] ");
        io::stdout().flush()?;

        let mut response = String::new();
        io::stdin().lock().read_line(&mut response)?;
        if !response.trim().eq_ignore_ascii_case("y") {
            println!("Login cancelled.");
            return Ok(());
        }
    }

    app.session.sign_in().context("build sign-in URL")?;

    println!("After signing in, your browser is sent to:");
    println!("  {}", app.config.auth.redirect_uri()?);
    print!("Paste the full URL from the address bar: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    let input = input.trim();
    if input.is_empty() {
        anyhow::bail!("No redirect URL provided");
    }

    callback(app, input).await
}

pub async fn callback(app: &App, raw_url: &str) -> Result<()> {
    let url = Url::parse(raw_url.trim()).with_context(|| format!("parse redirect URL '{raw_url}'"))?;

    let handler = CallbackHandler::new(Arc::clone(&app.session));
    handler.handle(&url).await.into_result()?;

    let user = app.session.current_user()?;
    println!("✓ Signed in as {}", display_name(&user));
    Ok(())
}

pub fn logout(app: &App) -> Result<()> {
    let was_signed_in = app.session.credential().is_some();
    app.session.sign_out()?;

    if was_signed_in {
        println!("✓ Signed out");
    } else {
        println!("Not signed in (no stored session).");
    }
    Ok(())
}

pub fn whoami(app: &App) {
    let Ok(user) = app.session.current_user() else {
        println!("Not signed in");
        return;
    };

    let expires = format_timestamp(DateTime::from_timestamp(user.expiry_epoch_seconds, 0));
    if user.is_valid() {
        println!("Signed in as {}", display_name(&user));
    } else {
        println!("Session expired for {}", display_name(&user));
    }
    println!("  Subject: {}", user.subject);
    if let Some(username) = &user.username {
        println!("  Username: {username}");
    }
    if let Some(email) = &user.email {
        println!("  Email: {email}");
    }
    println!("  Expires: {expires}");
}

fn display_name(claims: &Claims) -> &str {
    claims
        .email
        .as_deref()
        .or(claims.username.as_deref())
        .unwrap_or(&claims.subject)
}
