//! Prints the Workspace CustomResourceDefinition as YAML.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/workspace.yaml
//! ```

use anyhow::Result;
use kube::CustomResourceExt;
use workspace_operator::Workspace;

fn main() -> Result<()> {
    print!("{}", serde_yaml::to_string(&Workspace::crd())?);
    Ok(())
}
