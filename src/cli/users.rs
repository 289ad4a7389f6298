//! Account administration commands
//!
//! These run as the system actor, so they bypass nothing but the need for a
//! session: every write still goes through the service layer and the audit log.

use clap::Subcommand;
use lyceum_core::{
    access::Actor,
    error::Result,
    types::{Role, UserId},
    LyceumConfig,
};

use super::helpers::{open_lms, short_id};

#[derive(Subcommand)]
pub enum UserAction {
    /// Create an account
    Create {
        /// Email address (login name)
        #[arg(long)]
        email: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Initial password
        #[arg(long, env = "LYCEUM_PASSWORD")]
        password: String,

        /// Role: student, instructor or admin
        #[arg(long, default_value = "student")]
        role: Role,
    },

    /// List accounts
    List {
        /// Maximum number of accounts to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Change an account's role
    SetRole {
        /// User id
        user_id: String,

        /// New role
        role: Role,
    },
}

/// Handle user administration command
pub async fn handle(action: UserAction, config: &LyceumConfig) -> Result<()> {
    let lms = open_lms(config).await?;
    let actor = Actor::system();

    match action {
        UserAction::Create {
            email,
            name,
            password,
            role,
        } => {
            let user = lms.create_user(&actor, &email, &name, &password, role).await?;
            println!("Created {} {} ({})", user.role, user.email, user.id);
        }
        UserAction::List { limit } => {
            let users = lms.list_users(&actor, limit).await?;
            if users.is_empty() {
                println!("No users");
                return Ok(());
            }
            println!("{:<10} {:<12} {:<32} NAME", "ID", "ROLE", "EMAIL");
            for user in users {
                println!(
                    "{:<10} {:<12} {:<32} {}",
                    short_id(&user.id),
                    user.role,
                    user.email,
                    user.name
                );
            }
        }
        UserAction::SetRole { user_id, role } => {
            let user_id = UserId::from_string(&user_id)?;
            let user = lms.set_role(&actor, user_id, role).await?;
            println!("{} is now {}", user.email, user.role);
        }
    }
    Ok(())
}
