use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::database::UserRecord;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a single mirrored user
pub fn output_user(output_format: &OutputFormat, user: &UserRecord) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "user": user }))?);
        }
        OutputFormat::Text => {
            println!("ID:      {}", user.id);
            println!("Email:   {}", user.email.as_deref().unwrap_or("-"));
            println!("Name:    {}", user.name.as_deref().unwrap_or("-"));
            println!("Avatar:  {}", user.avatar.as_deref().unwrap_or("-"));
            println!("Role:    {}", user.role);
            println!("Created: {}", user.created_at.format("%Y-%m-%d %H:%M"));
            println!("Updated: {}", user.updated_at.format("%Y-%m-%d %H:%M"));
        }
    }
    Ok(())
}
