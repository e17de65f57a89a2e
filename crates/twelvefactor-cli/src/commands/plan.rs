use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use twelvefactor_core::{AppManifest, Runner};
use twelvefactor_ecs::client::RegisterTaskDefinitionInput;
use twelvefactor_ecs::{EcsConfig, EcsScheduler, MemoryCluster};

/// What a run of the app creates on the backend.
#[derive(Debug, Serialize)]
pub struct Plan {
    pub cluster: String,
    pub services: Vec<PlannedService>,
    pub task_definitions: BTreeMap<String, RegisterTaskDefinitionInput>,
}

#[derive(Debug, Serialize)]
pub struct PlannedService {
    pub name: String,
    pub task_definition: String,
    pub desired_count: u32,
}

pub async fn plan(manifest: &str, config: Option<&str>, format: &str) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => EcsConfig::from_file(Path::new(path))?,
        None => EcsConfig::default(),
    };
    debug!(cluster = %config.cluster, delimiter = %config.delimiter, "config loaded");
    let plan = build_plan(Path::new(manifest), &config).await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&plan)?),
        _ => print_text(&plan),
    }
    Ok(())
}

/// Converge the manifest's app onto an empty in-memory cluster.
pub async fn build_plan(manifest: &Path, config: &EcsConfig) -> anyhow::Result<Plan> {
    let app = AppManifest::from_file(manifest)?.into_app()?;

    let cluster = Arc::new(MemoryCluster::new());
    let scheduler = EcsScheduler::new(cluster.clone(), config);
    scheduler.run(&app).await?;

    let mut services = Vec::new();
    for name in cluster.service_names(&config.cluster).await {
        if let Some(record) = cluster.service(&config.cluster, &name).await {
            services.push(PlannedService {
                name,
                task_definition: record.task_definition,
                desired_count: record.desired_count,
            });
        }
    }

    info!(
        manifest = %manifest.display(),
        app = %app.id,
        services = services.len(),
        "plan built"
    );

    Ok(Plan {
        cluster: config.cluster.clone(),
        services,
        task_definitions: cluster.task_definitions().await,
    })
}

fn print_text(plan: &Plan) {
    println!("Cluster: {}", plan.cluster);
    for service in &plan.services {
        println!();
        println!("  service {} (desired {})", service.name, service.desired_count);
        let Some(definition) = plan.task_definitions.get(&service.task_definition) else {
            continue;
        };
        println!("    task definition {}", service.task_definition);
        for container in &definition.container_definitions {
            println!("      image:   {}", container.image);
            println!("      command: {}", container.command.join(" "));
            println!("      cpu:     {}", container.cpu);
            println!("      memory:  {} MiB", container.memory);
            let mut env: Vec<_> = container.environment.iter().collect();
            env.sort_by(|a, b| a.name.cmp(&b.name));
            for kv in env {
                println!("      env:     {}={}", kv.name, kv.value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plan_lists_one_service_per_process() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        std::fs::write(
            &path,
            r#"
[app]
id = "acme"
image = "remind101/acme-inc"

[[process]]
name = "web"
command = "acme-inc web"
desired_count = 2
memory = "512MB"

[[process]]
name = "worker"
command = "acme-inc worker"
"#,
        )
        .unwrap();

        let plan = build_plan(&path, &EcsConfig::for_cluster("staging")).await.unwrap();
        assert_eq!(plan.cluster, "staging");

        let names: Vec<&str> = plan.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["acme--web", "acme--worker"]);
        assert_eq!(plan.services[0].desired_count, 2);
        assert_eq!(
            plan.task_definitions["acme--web:1"].container_definitions[0].memory,
            512
        );
    }

    #[tokio::test]
    async fn plan_reads_cluster_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("app.toml");
        let config = dir.path().join("ecs.toml");
        std::fs::write(
            &manifest,
            r#"
[app]
id = "acme"
image = "remind101/acme-inc"

[[process]]
name = "web"
command = "acme-inc web"
"#,
        )
        .unwrap();
        std::fs::write(&config, "cluster = \"production\"\n").unwrap();

        plan(
            manifest.to_str().unwrap(),
            Some(config.to_str().unwrap()),
            "json",
        )
        .await
        .unwrap();

        let missing = dir.path().join("missing.toml");
        assert!(plan(missing.to_str().unwrap(), None, "text").await.is_err());
    }
}
