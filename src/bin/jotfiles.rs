use std::path::PathBuf;

use jotfiles::bootstrap::build_workflow;
use jotfiles::config::Settings;
use jotfiles::scheduler::{self, Scheduler};
use jotfiles::utils::print_lists;

const DEFAULT_SETTINGS: &str = "settings.json";

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut print_only = false;
    let mut settings_path = PathBuf::from(DEFAULT_SETTINGS);
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--print" => print_only = true,
            path => settings_path = PathBuf::from(path),
        }
    }

    let settings = match Settings::from_file(&settings_path) {
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        },
        Ok(settings) => settings,
    };
    let workflow = match build_workflow(&settings) {
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        },
        Ok(workflow) => workflow,
    };

    if print_only {
        let layout = workflow.reconciler().layout();
        let lists = [layout.backlog_list.as_str(), layout.done_list.as_str()];
        if let Err(err) = print_lists(workflow.reconciler().board().as_ref(), &lists).await {
            log::error!("Unable to print the board: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let (handle, ticker) = scheduler::ticker(std::time::Duration::from_secs(settings.schedule.tick_secs.max(1)));
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::error!("Unable to listen for shutdown signals: {}", err);
            // Dropping the handle would stop the scheduler
            std::future::pending::<()>().await;
        }
        log::info!("Shutting down after the current job");
        handle.cancel();
    });

    let mut scheduler = match Scheduler::from_settings(&settings.schedule) {
        Ok(scheduler) => scheduler,
        Err(err) => {
            log::error!("Invalid schedule: {}", err);
            std::process::exit(1);
        },
    };
    scheduler.run(&workflow, ticker).await;
}
