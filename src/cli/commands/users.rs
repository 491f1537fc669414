use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_success, output_user};
use crate::cli::{CliContext, OutputFormat};
use crate::database::UserStore;
use crate::identity::{HttpIdentityProvider, IdentityProvider};
use crate::onboarding::user_record;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Show the mirrored row for a user")]
    Show {
        #[arg(help = "Identity provider user ID")]
        id: String,
    },

    #[command(about = "Delete the mirrored row for a user")]
    Delete {
        #[arg(help = "Identity provider user ID")]
        id: String,
    },

    #[command(about = "Re-sync a user from the identity provider")]
    Sync {
        #[arg(help = "Identity provider user ID")]
        id: String,
    },
}

pub async fn handle(
    cmd: UserCommands,
    context: &CliContext,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let store = context.store();

    match cmd {
        UserCommands::Show { id } => match store.find_user(&id).await? {
            Some(user) => output_user(&output_format, &user),
            None => Err(anyhow::anyhow!("User '{}' not found", id)),
        },
        UserCommands::Delete { id } => {
            store.delete_user(&id).await?;
            output_success(
                &output_format,
                &format!("User '{}' deleted", id),
                Some(json!({ "id": id })),
            )
        }
        UserCommands::Sync { id } => {
            let provider = HttpIdentityProvider::new(
                &context.config.identity.api_url,
                context.config.identity.secret_key.clone(),
            )?;
            let identity = provider
                .current_identity(&id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Identity provider has no user '{}'", id))?;

            let outcome = store.sync_user(&user_record(&identity)).await?;
            output_success(
                &output_format,
                &format!("User '{}' {}", id, outcome.as_str()),
                Some(json!({ "id": id, "outcome": outcome.as_str() })),
            )
        }
    }
}
