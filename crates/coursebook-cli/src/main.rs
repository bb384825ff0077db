//! Coursebook CLI - browse the course calendar and manage enrollments
//! from the terminal, against the same data layer the booking site uses.

mod format;

use std::io;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use coursebook_core::models::{CourseType, Level};
use coursebook_core::schedule::week_start;
use coursebook_core::service::{COURSES, ENROLLMENTS, TESTIMONIALS, USERS};
use coursebook_core::{Config, DataError, DataService};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use format::{format_course_line, format_day, format_slot, format_timestamp, parse_course_type, parse_level};

// ============================================================================
// Constants
// ============================================================================

/// When set, logs are also written to a daily rolling file in this directory
const LOG_DIR_ENV: &str = "COURSEBOOK_LOG_DIR";

const LOG_FILE_PREFIX: &str = "coursebook.log";

const USAGE: &str = "\
Usage: coursebook <command> [args]

Commands:
  schedule [level] [type] [YYYY-MM-DD]   Week view (default: adult presentiel, this week)
  schedule-json                          Full calendar index as JSON
  courses                                List all courses
  enroll <student-id> <course-id>        Enroll a student
  unenroll <student-id> <course-id>      Cancel an enrollment
  enrollments <student-id>               A student's active enrollments
  preload                                Warm every collection and report status";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must be held until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(ExitCode::FAILURE);
    };
    if command == "-h" || command == "--help" {
        println!("{}", USAGE);
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::load()?.with_env_overrides();
    let service = DataService::from_config(&config)?;
    let _sweeper = config
        .sweep_interval()
        .map(|interval| service.spawn_cache_sweeper(interval));

    info!(command = %command, "Coursebook starting");

    let result = match command.as_str() {
        "schedule" => show_schedule(&service, &args[1..]).await,
        "schedule-json" => dump_schedule(&service).await,
        "courses" => list_courses(&service).await,
        "enroll" => {
            let (student, course) = student_and_course(&args[1..])?;
            enroll(&service, student, course).await
        }
        "unenroll" => {
            let (student, course) = student_and_course(&args[1..])?;
            unenroll(&service, student, course).await
        }
        "enrollments" => {
            let student = args.get(1).ok_or_else(|| anyhow!("Missing <student-id>\n\n{}", USAGE))?;
            list_enrollments(&service, student).await
        }
        "preload" => preload(&service).await,
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            report(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Print an error with a hint about whether retrying could help.
fn report(e: &anyhow::Error) {
    eprintln!("Error: {}", e);
    if let Some(data_error) = e.downcast_ref::<DataError>() {
        if data_error.is_retryable() {
            eprintln!("This looks temporary; try again in a moment.");
        }
    }
}

fn student_and_course(args: &[String]) -> Result<(&str, &str)> {
    match args {
        [student, course, ..] => Ok((student.as_str(), course.as_str())),
        _ => bail!("Expected <student-id> <course-id>\n\n{}", USAGE),
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn show_schedule(service: &DataService, args: &[String]) -> Result<()> {
    let level = match args.first() {
        Some(s) => parse_level(s).ok_or_else(|| anyhow!("Unknown level '{}'", s))?,
        None => Level::Adult,
    };
    let course_type = match args.get(1) {
        Some(s) => parse_course_type(s).ok_or_else(|| anyhow!("Unknown course type '{}'", s))?,
        None => CourseType::Presentiel,
    };
    let day = match args.get(2) {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))?,
        None => Local::now().date_naive(),
    };

    let schedule = service.get_schedule_data().await?;
    let start = week_start(day);

    println!("{} / {} - week of {}", level, course_type, start.format("%Y-%m-%d"));
    for (date, courses) in schedule.week(level, course_type, start) {
        println!("{}", format_day(date));
        if courses.is_empty() {
            println!("  -");
        }
        for slot in courses {
            println!("{}", format_slot(slot));
        }
    }
    Ok(())
}

async fn dump_schedule(service: &DataService) -> Result<()> {
    let schedule = service.get_schedule_data().await?;
    println!("{}", serde_json::to_string_pretty(&schedule)?);
    Ok(())
}

async fn list_courses(service: &DataService) -> Result<()> {
    let courses = service.get_courses_with_source().await?;
    if courses.is_overlay() {
        eprintln!("(showing locally modified course list)");
    }
    for course in courses.data() {
        println!("{}", format_course_line(course));
    }
    Ok(())
}

async fn enroll(service: &DataService, student_id: &str, course_id: &str) -> Result<()> {
    let record = service.enroll_student(student_id, course_id).await?;
    let course = service.get_course(course_id).await?;
    println!(
        "Enrolled {} in {} ({} {}), enrollment {}, seats {}",
        student_id,
        course_id,
        course.language,
        course.schedule.date.as_deref().unwrap_or("undated"),
        record.id,
        course.display_seats()
    );
    Ok(())
}

async fn unenroll(service: &DataService, student_id: &str, course_id: &str) -> Result<()> {
    let record = service.unenroll_student(student_id, course_id).await?;
    println!("Cancelled enrollment {} of {} in {}", record.id, student_id, course_id);
    Ok(())
}

async fn list_enrollments(service: &DataService, student_id: &str) -> Result<()> {
    let enrollments = service.get_student_enrollments(student_id).await?;
    if enrollments.is_empty() {
        println!("No active enrollments for {}", student_id);
        return Ok(());
    }
    for entry in enrollments {
        let since = format_timestamp(&entry.enrollment.enrollment_date);
        match entry.course {
            Some(course) => println!("{}  (since {})", format_course_line(&course), since),
            None => println!("{:<10} (course no longer listed, since {})", entry.enrollment.course_id, since),
        }
    }
    Ok(())
}

async fn preload(service: &DataService) -> Result<()> {
    let loaded = service.preload().await;
    println!("Loaded {} collections", loaded);
    for resource in [COURSES, ENROLLMENTS, USERS, TESTIMONIALS] {
        let age = service
            .cache_age(resource)
            .unwrap_or_else(|| "not cached".to_string());
        println!("  {:<14} {}", resource, age);
    }
    Ok(())
}
