//! Session commands

use backoffice_domain::{LoginCredentials, LoginResult, Session};
use tracing::info;

use crate::context::AppContext;
use crate::utils::command_helpers::execute_logged;

/// Log in with email and password.
///
/// Never fails: a rejected login is reported in the result so the form can
/// show the server's message.
pub async fn login(
    ctx: &AppContext,
    email: &str,
    password: &str,
    remember_me: bool,
) -> LoginResult {
    let credentials = &LoginCredentials::new(email, password).remember_me(remember_me);
    let lifecycle = &ctx.session;

    let outcome = execute_logged("auth::login", || async move {
        let session = lifecycle.login(credentials).await?;
        Ok(session.user().cloned())
    })
    .await;

    match outcome {
        Ok(user) => LoginResult { success: true, error: None, user },
        Err(err) => LoginResult::from(Err(err)),
    }
}

/// Log out; the session is `Unauthenticated` afterwards whatever the server
/// says.
pub async fn logout(ctx: &AppContext) -> Session {
    let session = ctx.session.logout().await;
    info!(command = "auth::logout", "command_execution_success");
    session
}

/// Current session snapshot; never touches the network.
pub fn current_session(ctx: &AppContext) -> Session {
    ctx.session.current_session()
}

/// Resolve the session at startup for the route the UI opened on.
///
/// Returns the session together with the login redirect the UI should follow,
/// if any.
pub async fn initialize_session(ctx: &AppContext, route: &str) -> (Session, Option<String>) {
    let session = ctx.session.initialize(route).await;
    let redirect = ctx.session.login_redirect(route);

    info!(
        command = "auth::initialize_session",
        phase = %session.phase(),
        redirect = redirect.as_deref().unwrap_or_default(),
        "command_execution_success"
    );

    (session, redirect)
}
