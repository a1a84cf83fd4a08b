// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Parser;
use figment::Figment;
use janitor_config::{ConfigurationSection, RootConfig};
use tokio::io::AsyncWriteExt;
use tracing::{info, info_span};

#[derive(Parser, Debug)]
pub(super) struct Options {
    #[command(subcommand)]
    subcommand: Subcommand,
}

#[derive(Parser, Debug)]
enum Subcommand {
    /// Dump the current config as YAML
    Dump {
        /// The path to the config file to dump
        ///
        /// If not specified, the config will be written to stdout
        #[clap(short, long)]
        output: Option<Utf8PathBuf>,
    },

    /// Check a config file
    Check,

    /// Print the JSON schema of the configuration file
    Schema {
        /// The path to write the schema to
        ///
        /// If not specified, the schema will be written to stdout
        #[clap(short, long)]
        output: Option<Utf8PathBuf>,
    },
}

async fn write_output(output: Option<Utf8PathBuf>, content: &str) -> anyhow::Result<()> {
    if let Some(output) = output {
        info!("Writing to {output:?}");
        let mut file = tokio::fs::File::create(&output)
            .await
            .with_context(|| format!("could not create {output}"))?;
        file.write_all(content.as_bytes()).await?;
    } else {
        info!("Writing to standard output");
        tokio::io::stdout().write_all(content.as_bytes()).await?;
    }

    Ok(())
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        use Subcommand as SC;
        match self.subcommand {
            SC::Dump { output } => {
                let _span = info_span!("cli.config.dump").entered();

                let config = RootConfig::extract(figment)
                    .map_err(anyhow::Error::from_boxed)
                    .context("invalid configuration")?;
                let config = serde_yaml::to_string(&config)?;

                write_output(output, &config).await?;
            }

            SC::Check => {
                let _span = info_span!("cli.config.check").entered();

                let _config = RootConfig::extract(figment)
                    .map_err(anyhow::Error::from_boxed)
                    .context("invalid configuration")?;
                info!("Configuration file looks good");
            }

            SC::Schema { output } => {
                let _span = info_span!("cli.config.schema").entered();

                let schema = schemars::schema_for!(RootConfig);
                let mut schema = serde_json::to_string_pretty(&schema)?;
                schema.push('\n');

                write_output(output, &schema).await?;
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}
