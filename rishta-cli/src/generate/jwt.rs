use std::fs;

use argh::FromArgs;
use camino::Utf8PathBuf;
use rishta_core::auth::Role;
use rishta_core::jwt::{self, DEFAULT_AUDIENCE, DEFAULT_ISSUER};

use crate::CliError;

/// Issue JSON Web Token signed by a key in a given file.
#[derive(FromArgs, PartialEq, Eq, Debug)]
#[argh(subcommand, name = "jwt")]
pub struct GenerateJwt {
    /// path to PEM file containing signing key
    #[argh(positional)]
    key_file_name: Utf8PathBuf,
    /// path to output JWT file
    #[argh(positional)]
    file_name: Utf8PathBuf,
    /// subject the JWT is issued for, e.g. an account short ID.
    #[argh(positional)]
    subject: String,
    /// name of issuer (default: rishta.app/auth)
    #[argh(option, default = "DEFAULT_ISSUER.to_string()")]
    issuer: String,
    /// name of audience (default: rishta.app/server)
    #[argh(option, default = "DEFAULT_AUDIENCE.to_string()")]
    audience: String,
    /// how long until the JWT expires, in hours from now (default: 12)
    #[argh(option, default = "12")]
    expiry_hours: i64,
    /// issue with the administrator role instead of member
    #[argh(switch)]
    administrator: bool,
}

impl GenerateJwt {
    pub async fn run(&self) -> Result<(), CliError> {
        tracing::info!("issuing JWT signed by key in {}", self.key_file_name);

        let pem = fs::read(&self.key_file_name)?;
        let generator = jwt::Generator::new_from_pem(&pem, &self.issuer, &self.audience)
            .map_err(CliError::JWTJWKSGenerationError)?;

        let role = if self.administrator {
            Role::Administrator
        } else {
            Role::Member
        };

        let jwt = generator
            .generate(&self.subject, self.expiry_hours, Some(vec![role]))
            .map_err(CliError::JWTJWKSGenerationError)?;

        tracing::info!("saving JWT to {}", self.file_name);
        fs::write(&self.file_name, jwt.as_bytes())?;

        Ok(())
    }
}
