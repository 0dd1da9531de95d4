//! taskflow task command implementations.

use serde::Serialize;

use crate::cli::{parse_due, report_remote, short_id, Context, GlobalOptions, RemoteOutput};
use crate::error::{Error, Result};
use crate::model::{Category, NewTask, Priority, Task, TaskPatch, TaskStatus};
use crate::ordering::{SortDirection, SortKey};
use crate::output::{emit_success, HumanOutput};
use crate::query::TaskQuery;

pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub due: Option<String>,
}

pub struct ListOptions {
    pub search: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub sort: String,
    pub desc: bool,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub clear_description: bool,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub no_category: bool,
    pub due: Option<String>,
    pub clear_due: bool,
}

#[derive(Serialize)]
struct TaskMutationOutput {
    task: Task,
    remote: RemoteOutput,
}

#[derive(Serialize)]
struct TaskListOutput<'a> {
    total: usize,
    query: &'a TaskQuery,
    tasks: Vec<&'a Task>,
}

#[derive(Serialize)]
struct TaskRemoveOutput {
    removed: Task,
    remote: RemoteOutput,
}

#[derive(Serialize)]
struct TaskMoveOutput {
    id: String,
    index: u32,
    moved: bool,
    remote: RemoteOutput,
}

fn parse_status(value: Option<&str>) -> Result<Option<TaskStatus>> {
    value.map(str::parse).transpose()
}

fn parse_priority(value: Option<&str>) -> Result<Option<Priority>> {
    value.map(str::parse).transpose()
}

fn task_line(task: &Task, categories: &[Category]) -> String {
    let mut line = format!(
        "#{} [{}][{}] {} {}",
        task.order,
        task.status,
        task.priority,
        short_id(&task.id),
        task.title
    );
    if let Some(due) = task.due_date {
        line.push_str(&format!(" (due: {})", due.format("%Y-%m-%d")));
    }
    if let Some(category_id) = task.category_id.as_deref() {
        let name = categories
            .iter()
            .find(|category| category.id == category_id)
            .map_or(category_id, |category| category.name.as_str());
        line.push_str(&format!(" (category: {name})"));
    }
    line
}

fn describe(human: &mut HumanOutput, task: &Task) {
    human.push_summary("ID", task.id.clone());
    human.push_summary("Status", task.status.to_string());
    human.push_summary("Priority", task.priority.to_string());
    human.push_summary("Position", task.order.to_string());
    if let Some(due) = task.due_date {
        human.push_summary("Due", due.to_rfc3339());
    }
}

pub fn run_add(global: &GlobalOptions, options: AddOptions) -> Result<()> {
    let mut ctx = Context::open(global)?;
    let category_id = match options.category.as_deref() {
        Some(id) => Some(ctx.category(id)?.id),
        None => None,
    };
    let new = NewTask {
        title: options.title,
        description: options.description,
        status: parse_status(options.status.as_deref())?.unwrap_or_default(),
        priority: parse_priority(options.priority.as_deref())?.unwrap_or_default(),
        category_id,
        due_date: options.due.as_deref().map(parse_due).transpose()?,
    };

    let committed = ctx.coordinator.create_task(new)?;
    let mut human = HumanOutput::new(format!("task add: {}", committed.value.title));
    describe(&mut human, &committed.value);
    report_remote(&mut human, &committed.remote);

    let output = TaskMutationOutput {
        remote: RemoteOutput::from(&committed.remote),
        task: committed.value,
    };
    emit_success(global.output(), "task add", &output, Some(&human))
}

pub fn run_list(global: &GlobalOptions, options: ListOptions) -> Result<()> {
    let ctx = Context::open(global)?;
    let category_id = match options.category.as_deref() {
        Some(id) => Some(ctx.category(id)?.id),
        None => None,
    };
    let query = TaskQuery {
        search: options.search,
        status: parse_status(options.status.as_deref())?,
        category_id,
        priority: parse_priority(options.priority.as_deref())?,
        sort: options.sort.parse::<SortKey>()?,
        direction: if options.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        },
    };

    let store = ctx.coordinator.store();
    let tasks = query.apply(store.tasks());

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", tasks.len().to_string());
    if tasks.is_empty() && store.tasks().is_empty() {
        human.push_next_step("taskflow task add \"...\"");
    }
    for task in &tasks {
        human.push_detail(task_line(task, store.categories()));
    }

    let output = TaskListOutput {
        total: tasks.len(),
        query: &query,
        tasks,
    };
    emit_success(global.output(), "task list", &output, Some(&human))
}

pub fn run_show(global: &GlobalOptions, id: &str) -> Result<()> {
    let ctx = Context::open(global)?;
    let task = ctx.task(id)?;

    let mut human = HumanOutput::new(format!("Task: {}", task.title));
    describe(&mut human, &task);
    if let Some(category_id) = task.category_id.as_deref() {
        let name = ctx
            .coordinator
            .store()
            .category(category_id)
            .map_or(category_id, |category| category.name.as_str());
        human.push_summary("Category", name);
    }
    human.push_summary("Created", task.created_at.to_rfc3339());
    human.push_summary("Updated", task.updated_at.to_rfc3339());
    if let Some(description) = task.description.as_deref() {
        human.push_detail(description);
    }

    emit_success(global.output(), "task show", &task, Some(&human))
}

pub fn run_edit(global: &GlobalOptions, options: EditOptions) -> Result<()> {
    let mut ctx = Context::open(global)?;
    let task = ctx.task(&options.id)?;

    let category_id = if options.no_category {
        Some(None)
    } else {
        match options.category.as_deref() {
            Some(id) => Some(Some(ctx.category(id)?.id)),
            None => None,
        }
    };
    let description = if options.clear_description {
        Some(None)
    } else {
        options.description.map(Some)
    };
    let due_date = if options.clear_due {
        Some(None)
    } else {
        options.due.as_deref().map(parse_due).transpose()?.map(Some)
    };
    let patch = TaskPatch {
        title: options.title,
        description,
        status: parse_status(options.status.as_deref())?,
        priority: parse_priority(options.priority.as_deref())?,
        category_id,
        due_date,
    };
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to change (pass at least one field flag)".to_string(),
        ));
    }

    let committed = ctx.coordinator.update_task(&task.id, patch)?;
    let mut human = HumanOutput::new(format!("task edit: {}", committed.value.title));
    describe(&mut human, &committed.value);
    report_remote(&mut human, &committed.remote);

    let output = TaskMutationOutput {
        remote: RemoteOutput::from(&committed.remote),
        task: committed.value,
    };
    emit_success(global.output(), "task edit", &output, Some(&human))
}

pub fn run_done(global: &GlobalOptions, id: &str) -> Result<()> {
    let mut ctx = Context::open(global)?;
    let task = ctx.task(id)?;
    let committed = ctx
        .coordinator
        .update_task(&task.id, TaskPatch::status(TaskStatus::Completed))?;

    let mut human = HumanOutput::new(format!("task done: {}", committed.value.title));
    human.push_summary("ID", committed.value.id.clone());
    report_remote(&mut human, &committed.remote);

    let output = TaskMutationOutput {
        remote: RemoteOutput::from(&committed.remote),
        task: committed.value,
    };
    emit_success(global.output(), "task done", &output, Some(&human))
}

pub fn run_rm(global: &GlobalOptions, id: &str) -> Result<()> {
    let mut ctx = Context::open(global)?;
    let task = ctx.task(id)?;
    let committed = ctx.coordinator.delete_task(&task.id)?;

    let mut human = HumanOutput::new(format!("task rm: {}", committed.value.title));
    human.push_summary("ID", committed.value.id.clone());
    human.push_summary(
        "Remaining",
        ctx.coordinator.store().tasks().len().to_string(),
    );
    report_remote(&mut human, &committed.remote);

    let output = TaskRemoveOutput {
        remote: RemoteOutput::from(&committed.remote),
        removed: committed.value,
    };
    emit_success(global.output(), "task rm", &output, Some(&human))
}

pub fn run_move(global: &GlobalOptions, id: &str, index: usize) -> Result<()> {
    let mut ctx = Context::open(global)?;
    let task = ctx.task(id)?;
    let committed = ctx.coordinator.reorder_task(&task.id, index)?;
    let position = ctx
        .coordinator
        .store()
        .task(&task.id)
        .map_or(task.order, |moved| moved.order);

    let header = if committed.value {
        format!("task move: {} -> #{position}", task.title)
    } else {
        format!("task move: {} already at #{position}", task.title)
    };
    let mut human = HumanOutput::new(header);
    report_remote(&mut human, &committed.remote);

    let output = TaskMoveOutput {
        id: task.id,
        index: position,
        moved: committed.value,
        remote: RemoteOutput::from(&committed.remote),
    };
    emit_success(global.output(), "task move", &output, Some(&human))
}
