use super::{reconcile, remote, session, Action};
use crate::{cli::globals::GlobalArgs, session::FileSessionStore};
use anyhow::Result;
use std::io;

pub(super) async fn execute(action: Action, globals: &GlobalArgs) -> Result<()> {
    let mut out = io::stdout().lock();

    match action {
        Action::SetToken { token } => {
            session::set_token(&FileSessionStore::new(&globals.session_file), token, &mut out)
        }
        Action::ShowSession => {
            session::show(&FileSessionStore::new(&globals.session_file), &mut out)
        }
        Action::ClearSession => {
            session::clear(&FileSessionStore::new(&globals.session_file), &mut out)
        }
        Action::Status => session::status(&FileSessionStore::new(&globals.session_file), &mut out),
        Action::Whoami => remote::whoami(&super::client(globals)?, &mut out).await,
        Action::Check { module, permission } => {
            remote::check(&super::client(globals)?, &module, &permission, &mut out).await
        }
        Action::Modules => remote::modules(&super::client(globals)?, &mut out).await,
        Action::Logout => remote::logout(&super::client(globals)?, &mut out).await,
        Action::Reconcile { document, output } => {
            let client = super::client(globals)?;
            reconcile::execute(
                &client,
                globals.config.concurrency,
                &document,
                output.as_deref(),
                &mut out,
            )
            .await
        }
    }
}
