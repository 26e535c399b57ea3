//! Scratch stack documents for tests.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::constants::{DEFAULT_DOCUMENT_NAME, SETTINGS_FILE_NAME};

/// A small network stack: a VPC, a subnet referencing it, a database with a secret
/// password, and an existing bucket.
pub const SAMPLE_DOCUMENT: &str = r"team: platform
service: payments
environment: dev
region: us-east-1
tags:
  owner: platform-team
resources:
  - name: vpc-01
    type: ec2.Vpc
    args:
      cidr_block: 10.0.0.0/16
  - name: subnet-01
    type: ec2.Subnet
    args:
      vpc_id: ref:vpc-01.id
      cidr_block: 10.0.1.0/24
  - name: db
    type: rds.Instance
    args:
      engine: postgres
      password: secret:db-password
      subnet_ids:
        - ref:subnet-01
  - name: shared-logs
    type: s3.Bucket
    existing: true
    args:
      bucket: company-shared-logs
";

/// A temporary directory with helpers to write the files a run reads.
///
/// The directory is removed when the fixture is dropped.
pub struct StackFixture {
    temp_dir: TempDir,
}

impl StackFixture {
    /// Create an empty fixture directory.
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new().context("Failed to create temp directory")?,
        })
    }

    /// The fixture directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `stackbuild.yaml`.
    pub fn write_document(&self, content: &str) -> Result<PathBuf> {
        self.write(DEFAULT_DOCUMENT_NAME, content)
    }

    /// Write `config.toml`.
    pub fn write_settings(&self, content: &str) -> Result<PathBuf> {
        self.write(SETTINGS_FILE_NAME, content)
    }

    /// Write `secrets.yaml`.
    pub fn write_secrets(&self, content: &str) -> Result<PathBuf> {
        self.write("secrets.yaml", content)
    }

    /// Write any file relative to the fixture directory.
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.path().join(relative);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
