//! taskflow category command implementations.

use serde::Serialize;

use crate::cli::{report_remote, short_id, Context, GlobalOptions, RemoteOutput};
use crate::error::{Error, Result};
use crate::model::{Category, CategoryPatch, NewCategory};
use crate::output::{emit_success, HumanOutput};

#[derive(Serialize)]
struct CategoryMutationOutput {
    category: Category,
    remote: RemoteOutput,
}

#[derive(Serialize)]
struct CategoryEntry<'a> {
    #[serde(flatten)]
    category: &'a Category,
    task_count: usize,
}

#[derive(Serialize)]
struct CategoryListOutput<'a> {
    total: usize,
    categories: Vec<CategoryEntry<'a>>,
}

#[derive(Serialize)]
struct CategoryRemoveOutput {
    removed: Category,
    detached_tasks: Vec<String>,
    remote: RemoteOutput,
}

pub fn run_add(global: &GlobalOptions, name: String, color: String) -> Result<()> {
    let mut ctx = Context::open(global)?;
    let committed = ctx
        .coordinator
        .create_category(NewCategory { name, color })?;

    let mut human = HumanOutput::new(format!("category add: {}", committed.value.name));
    human.push_summary("ID", committed.value.id.clone());
    human.push_summary("Color", committed.value.color.clone());
    report_remote(&mut human, &committed.remote);

    let output = CategoryMutationOutput {
        remote: RemoteOutput::from(&committed.remote),
        category: committed.value,
    };
    emit_success(global.output(), "category add", &output, Some(&human))
}

pub fn run_list(global: &GlobalOptions) -> Result<()> {
    let ctx = Context::open(global)?;
    let store = ctx.coordinator.store();
    let categories: Vec<CategoryEntry<'_>> = store
        .categories()
        .iter()
        .map(|category| CategoryEntry {
            category,
            task_count: store
                .tasks()
                .iter()
                .filter(|task| task.category_id.as_deref() == Some(category.id.as_str()))
                .count(),
        })
        .collect();

    let mut human = HumanOutput::new("Categories");
    human.push_summary("Total", categories.len().to_string());
    for entry in &categories {
        human.push_detail(format!(
            "{} {} {} ({} tasks)",
            short_id(&entry.category.id),
            entry.category.color,
            entry.category.name,
            entry.task_count
        ));
    }

    let output = CategoryListOutput {
        total: categories.len(),
        categories,
    };
    emit_success(global.output(), "category list", &output, Some(&human))
}

pub fn run_edit(
    global: &GlobalOptions,
    id: &str,
    name: Option<String>,
    color: Option<String>,
) -> Result<()> {
    if name.is_none() && color.is_none() {
        return Err(Error::InvalidArgument(
            "nothing to change (pass --name and/or --color)".to_string(),
        ));
    }
    let mut ctx = Context::open(global)?;
    let category = ctx.category(id)?;
    let committed = ctx
        .coordinator
        .update_category(&category.id, CategoryPatch { name, color })?;

    let mut human = HumanOutput::new(format!("category edit: {}", committed.value.name));
    human.push_summary("ID", committed.value.id.clone());
    human.push_summary("Color", committed.value.color.clone());
    report_remote(&mut human, &committed.remote);

    let output = CategoryMutationOutput {
        remote: RemoteOutput::from(&committed.remote),
        category: committed.value,
    };
    emit_success(global.output(), "category edit", &output, Some(&human))
}

pub fn run_rm(global: &GlobalOptions, id: &str) -> Result<()> {
    let mut ctx = Context::open(global)?;
    let category = ctx.category(id)?;
    let committed = ctx.coordinator.delete_category(&category.id)?;
    let removal = committed.value;

    let mut human = HumanOutput::new(format!("category rm: {}", removal.category.name));
    human.push_summary("ID", removal.category.id.clone());
    human.push_summary("Uncategorized tasks", removal.detached_tasks.len().to_string());
    report_remote(&mut human, &committed.remote);

    let output = CategoryRemoveOutput {
        removed: removal.category,
        detached_tasks: removal.detached_tasks,
        remote: RemoteOutput::from(&committed.remote),
    };
    emit_success(global.output(), "category rm", &output, Some(&human))
}
