use chrono::Datelike;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use workout_core::*;

#[derive(Parser)]
#[command(name = "lift")]
#[command(about = "Strength workout tracker with rest timer and weekly schedule", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's routine (default)
    Today,

    /// Show or edit the weekly schedule
    Schedule {
        #[command(subcommand)]
        action: Option<ScheduleAction>,
    },

    /// Pick a different routine for today only
    Override {
        #[command(subcommand)]
        action: Option<OverrideAction>,
    },

    /// List the routine library
    Routines,

    /// Run an interactive workout session
    Session {
        /// Routine to open the session from
        #[arg(long, conflicts_with = "today")]
        routine: Option<String>,

        /// Use today's scheduled (or overridden) routine
        #[arg(long)]
        today: bool,

        /// Allow finishing even if a workout was already logged today
        #[arg(long)]
        allow_repeat: bool,
    },

    /// Roll up WAL workouts to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// Print the routine for each weekday
    Show,
    /// Assign a routine to a weekday
    Set { weekday: String, routine_id: String },
    /// Make a weekday a rest day
    Clear { weekday: String },
}

#[derive(Subcommand)]
enum OverrideAction {
    /// Print today's override, if any
    Show,
    /// Use a routine for the rest of today
    Set { routine_id: String },
    /// Go back to the weekly schedule
    Clear,
}

fn main() -> Result<()> {
    // Initialize logging
    workout_core::logging::init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }

    match cli.command {
        Some(Commands::Today) | None => cmd_today(&config),
        Some(Commands::Schedule { action }) => {
            cmd_schedule(&config, action.unwrap_or(ScheduleAction::Show))
        }
        Some(Commands::Override { action }) => {
            cmd_override(&config, action.unwrap_or(OverrideAction::Show))
        }
        Some(Commands::Routines) => cmd_routines(&config),
        Some(Commands::Session {
            routine,
            today,
            allow_repeat,
        }) => cmd_session(&config, routine, today, allow_repeat),
        Some(Commands::Rollup { cleanup }) => cmd_rollup(&config, cleanup),
    }
}

fn open_resolver(config: &Config) -> Result<ScheduleResolver<FilePlannerStore>> {
    let store = FilePlannerStore::new(&config.data.data_dir, &config.user.id);
    ScheduleResolver::load(
        store,
        SystemClock,
        config.schedule.effective_check_interval(),
    )
}

fn load_routines(config: &Config) -> Result<RoutineBook> {
    RoutineBook::load(&config.routines_path())
}

fn routine_label(book: &RoutineBook, id: &str) -> String {
    match book.get(id) {
        Some(routine) => format!("{} [{}]", routine.name, id),
        None => format!("{} (not in routine library)", id),
    }
}

fn cmd_today(config: &Config) -> Result<()> {
    let resolver = open_resolver(config)?;
    let book = load_routines(config)?;
    let today = resolver.today();

    println!("Today is {} ({})", weekday_name(today.weekday()), today);

    match resolver.today_routine() {
        Some((id, RoutineSource::Override)) => {
            println!("  Routine: {} - override for today", routine_label(&book, &id));
        }
        Some((id, RoutineSource::Weekly)) => {
            println!("  Routine: {}", routine_label(&book, &id));
        }
        None => println!("  Rest day - no routine scheduled"),
    }

    if has_logged_today(&config.wal_path(), &config.csv_path(), today)? {
        println!("  ✓ Workout already logged today");
    }

    Ok(())
}

fn cmd_schedule(config: &Config, action: ScheduleAction) -> Result<()> {
    let mut resolver = open_resolver(config)?;
    let book = load_routines(config)?;

    match action {
        ScheduleAction::Show => {
            for (day, routine) in resolver.schedule().week() {
                match routine {
                    Some(id) => println!("{:<10} {}", weekday_name(day), routine_label(&book, id)),
                    None => println!("{:<10} -", weekday_name(day)),
                }
            }
        }
        ScheduleAction::Set {
            weekday,
            routine_id,
        } => {
            let day = parse_weekday(&weekday)?;
            let routine = book.require(&routine_id)?;
            resolver.set_weekday(day, &routine.id)?;
            println!("✓ {} is now {}", weekday_name(day), routine.name);
        }
        ScheduleAction::Clear { weekday } => {
            let day = parse_weekday(&weekday)?;
            resolver.clear_weekday(day)?;
            println!("✓ {} is now a rest day", weekday_name(day));
        }
    }

    Ok(())
}

fn cmd_override(config: &Config, action: OverrideAction) -> Result<()> {
    let mut resolver = open_resolver(config)?;
    let book = load_routines(config)?;

    match action {
        OverrideAction::Show => match resolver.current_override() {
            Some(o) => println!("Override for {}: {}", o.date, routine_label(&book, &o.routine_id)),
            None => println!("No override for today"),
        },
        OverrideAction::Set { routine_id } => {
            let name = book.require(&routine_id)?.name.clone();
            let o = resolver.set_override(routine_id)?;
            println!("✓ Using {} for {}", name, o.date);
        }
        OverrideAction::Clear => {
            resolver.clear_override()?;
            println!("✓ Override cleared");
        }
    }

    Ok(())
}

fn cmd_routines(config: &Config) -> Result<()> {
    let book = load_routines(config)?;

    for routine in &book.routines {
        println!("{:<12} {}", routine.id, routine.name);
        for ex in &routine.exercises {
            println!(
                "    {} - {} sets, rest {}",
                ex.name,
                ex.sets.len(),
                format_rest(ex.rest_seconds)
            );
        }
    }

    Ok(())
}

fn cmd_rollup(config: &Config, cleanup: bool) -> Result<()> {
    let wal_path = config.wal_path();
    let csv_path = config.csv_path();

    if !wal_path.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let count = workout_core::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path)?;

    println!("✓ Rolled up {} workouts to CSV", count);
    println!("  CSV: {}", csv_path.display());

    if cleanup {
        if let Some(wal_dir) = wal_path.parent() {
            let cleaned = workout_core::csv_rollup::cleanup_processed_wals(wal_dir)?;
            if cleaned > 0 {
                println!("✓ Cleaned up {} processed WAL files", cleaned);
            }
        }
    }

    Ok(())
}

// ============================================================================
// Interactive session
// ============================================================================

const SESSION_HELP: &str = "\
Commands (<ex> is a 1-based number or exercise name):
  add <name>             add an exercise with one default set
  remove <ex>            remove an exercise
  plan <ex> <w> <r>      add a planned set
  unplan <ex> <set>      remove a planned set
  rest <ex> <MM:SS>      change an exercise's rest time
  start | pause | resume
  log <ex> <w> <r>       log a performed set
  logp <ex>              log the next planned set as prescribed
  undo <ex>              undo the last logged set
  skip | ready           end the current rest early
  ack                    dismiss an expired rest
  wait <secs>            let time pass
  status                 show the session
  finish                 complete the session
  payload                print the submission payload
  submit                 save the completed session
  quit";

/// Longest simulated wait a single `wait` command accepts (one day)
const MAX_WAIT_SECONDS: u32 = 24 * 60 * 60;

struct SessionShell<'a> {
    config: &'a Config,
    clock: OffsetClock,
    controller: SessionController,
    allow_repeat: bool,
    submitted: bool,
}

enum Flow {
    Continue,
    Quit,
}

fn cmd_session(
    config: &Config,
    routine_id: Option<String>,
    today: bool,
    allow_repeat: bool,
) -> Result<()> {
    let book = load_routines(config)?;

    let routine_id = if today {
        let resolver = open_resolver(config)?;
        match resolver.today_routine() {
            Some((id, _)) => Some(id),
            None => {
                println!("No routine scheduled for today; starting a {}", STANDALONE_WORKOUT_NAME);
                None
            }
        }
    } else {
        routine_id
    };

    let routine = routine_id.as_deref().map(|id| book.require(id)).transpose()?;
    let clock = OffsetClock::new();
    let controller = SessionController::new(routine, clock.clone());

    println!(
        "Session: {} ({} exercises). Type 'help' for commands.",
        controller.routine_name(),
        controller.exercises().len()
    );

    let mut shell = SessionShell {
        config,
        clock,
        controller,
        allow_repeat,
        submitted: false,
    };
    shell.run()
}

impl SessionShell<'_> {
    fn run(&mut self) -> Result<()> {
        // Real elapsed time only; simulated waits are applied by `wait`
        let clock = SystemClock;
        let mut ticker = SecondTicker::new(clock.now());
        let stdin = io::stdin();

        loop {
            print!("> ");
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }

            let ticks = ticker.poll(clock.now());
            self.advance(ticks);

            match self.dispatch(line.trim()) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => println!("Error: {}", e),
            }
        }

        if self.controller.summary().is_some() && !self.submitted {
            println!("⚠ Finished workout was not submitted");
        }
        Ok(())
    }

    fn advance(&mut self, seconds: u32) {
        for expiry in self.controller.advance(seconds) {
            let name = self
                .controller
                .exercise(expiry.exercise_index)
                .map(|e| e.name().to_string())
                .unwrap_or_default();
            println!(
                "⏰ Rest over for {} ({})",
                name,
                format_rest(expiry.planned_seconds)
            );
        }
    }

    fn dispatch(&mut self, line: &str) -> Result<Flow> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Flow::Continue);
        };
        let args: Vec<&str> = words.collect();

        match command {
            "help" => println!("{}", SESSION_HELP),
            "add" => {
                let name = args.join(" ");
                if name.is_empty() {
                    return Err(Error::InvalidInput("usage: add <name>".into()));
                }
                let spec = ad_hoc_exercise(&name, &self.config.session);
                let index = self.controller.add_exercise(spec)?;
                println!("Added #{} {}", index + 1, name);
            }
            "remove" => {
                let index = self.find_exercise(&args.join(" "))?;
                let removed = self.controller.remove_exercise(index)?;
                println!("Removed {}", removed.name);
            }
            "plan" => {
                let (ex, weight, reps) = split_set_args(&args, "plan <ex> <weight> <reps>")?;
                let index = self.find_exercise(&ex)?;
                self.controller.add_planned_set(index, weight, reps)?;
                println!(
                    "Planned {} {} x {} for {}",
                    weight,
                    self.units(),
                    reps,
                    self.name_of(index)
                );
            }
            "unplan" => {
                let (set, ex) = args
                    .split_last()
                    .ok_or_else(|| Error::InvalidInput("usage: unplan <ex> <set>".into()))?;
                let set: usize = parse_arg(set, "set number")?;
                let index = self.find_exercise(&ex.join(" "))?;
                let set_index = set
                    .checked_sub(1)
                    .ok_or_else(|| Error::InvalidInput("Sets are numbered from 1".into()))?;
                self.controller.remove_planned_set(index, set_index)?;
                println!("Removed planned set {} from {}", set, self.name_of(index));
            }
            "rest" => {
                let (duration, ex) = args
                    .split_last()
                    .ok_or_else(|| Error::InvalidInput("usage: rest <ex> <MM:SS>".into()))?;
                let seconds = parse_clock(duration)?;
                let index = self.find_exercise(&ex.join(" "))?;
                self.controller.set_rest_duration(index, seconds)?;
                println!("Rest for {} is now {}", self.name_of(index), format_rest(seconds));
            }
            "start" => {
                self.controller.start()?;
                println!("▶ Started {}", self.controller.routine_name());
            }
            "pause" => {
                self.controller.pause()?;
                println!("⏸ Paused at {}", format_clock(self.controller.elapsed_seconds()));
            }
            "resume" => {
                self.controller.resume()?;
                println!("▶ Resumed");
            }
            "log" => {
                let (ex, weight, reps) = split_set_args(&args, "log <ex> <weight> <reps>")?;
                let index = self.find_exercise(&ex)?;
                let outcome = self.controller.log_set(index, weight, reps)?;
                self.report_logged(index, outcome);
            }
            "logp" => {
                let index = self.find_exercise(&args.join(" "))?;
                let outcome = self.controller.log_planned_set(index)?;
                self.report_logged(index, outcome);
            }
            "undo" => {
                let index = self.find_exercise(&args.join(" "))?;
                match self.controller.undo_set(index)? {
                    Some(set) => println!(
                        "Undid {} {} x {} on {}",
                        set.weight,
                        self.units(),
                        set.reps,
                        self.name_of(index)
                    ),
                    None => println!("Nothing to undo on {}", self.name_of(index)),
                }
            }
            "skip" | "ready" => match self.controller.skip_rest() {
                Some(skip) => println!(
                    "Rest ended after {} for {}",
                    format_clock(u64::from(skip.actual_seconds)),
                    self.name_of(skip.exercise_index)
                ),
                None => println!("No rest running"),
            },
            "ack" => {
                if self.controller.acknowledge_rest() {
                    println!("Rest dismissed");
                } else {
                    println!("No expired rest");
                }
            }
            "wait" => {
                let seconds: u32 = parse_arg(args.first().copied().unwrap_or(""), "seconds")?;
                if seconds > MAX_WAIT_SECONDS {
                    return Err(Error::InvalidInput(format!(
                        "Cannot wait more than {} seconds at once",
                        MAX_WAIT_SECONDS
                    )));
                }
                self.clock.advance_secs(i64::from(seconds));
                self.advance(seconds);
            }
            "status" => self.print_status(),
            "finish" => self.finish()?,
            "payload" => {
                let summary = self
                    .controller
                    .summary()
                    .ok_or_else(|| Error::State("Session is not finished".into()))?;
                let payload =
                    FinishSubmission::with_units(summary, self.config.user.unit_system);
                println!("{}", serde_json::to_string_pretty(&payload)?);
            }
            "submit" => self.submit()?,
            "quit" | "exit" => return Ok(Flow::Quit),
            other => {
                return Err(Error::InvalidInput(format!(
                    "Unknown command '{}'; type 'help'",
                    other
                )))
            }
        }

        Ok(Flow::Continue)
    }

    fn finish(&mut self) -> Result<()> {
        let today = self.clock.today();
        if !self.allow_repeat
            && has_logged_today(&self.config.wal_path(), &self.config.csv_path(), today)?
        {
            return Err(Error::State(
                "A workout was already logged today (use --allow-repeat)".into(),
            ));
        }

        let summary = self.controller.finish()?;
        println!(
            "✓ Finished {}: {} sets in {} min",
            summary.routine_name,
            summary.total_sets(),
            summary.duration_minutes
        );
        Ok(())
    }

    fn submit(&mut self) -> Result<()> {
        if self.submitted {
            println!("Already submitted");
            return Ok(());
        }
        let summary = self
            .controller
            .summary()
            .ok_or_else(|| Error::State("Finish the session before submitting".into()))?;

        let mut sink = JsonlSink::new(self.config.wal_path());
        submit(summary, &mut sink)?;
        self.submitted = true;

        let mut listeners: Vec<Box<dyn CompletionListener>> = vec![Box::new(
            CompletionFlagFile::new(&self.config.data.data_dir, &self.config.user.id),
        )];
        broadcast(&mut listeners, &CompletionNotice::from(summary));

        println!("✓ Workout saved");
        Ok(())
    }

    fn find_exercise(&self, arg: &str) -> Result<usize> {
        if arg.is_empty() {
            return Err(Error::InvalidInput("Missing exercise".into()));
        }
        if let Ok(n) = arg.parse::<usize>() {
            return n
                .checked_sub(1)
                .ok_or_else(|| Error::InvalidInput("Exercises are numbered from 1".into()));
        }
        self.controller
            .exercises()
            .iter()
            .position(|e| e.name().eq_ignore_ascii_case(arg))
            .ok_or_else(|| Error::InvalidInput(format!("No exercise named '{}'", arg)))
    }

    fn units(&self) -> &'static str {
        self.config.user.unit_system.weight_label()
    }

    fn name_of(&self, index: usize) -> String {
        self.controller
            .exercise(index)
            .map(|e| e.name().to_string())
            .unwrap_or_default()
    }

    fn report_logged(&self, index: usize, outcome: SetOutcome) {
        let Some(exercise) = self.controller.exercise(index) else {
            return;
        };
        let done = exercise.completed_sets().len();
        match outcome {
            SetOutcome::MoreRemaining => println!(
                "Logged set {} of {}. Rest {} started",
                done,
                exercise.name(),
                format_rest(exercise.rest_seconds())
            ),
            SetOutcome::Final => println!("Logged final set of {}", exercise.name()),
        }
    }

    fn print_status(&self) {
        let snapshot = self.controller.snapshot();
        println!(
            "{} [{:?}] {}",
            snapshot.routine_name,
            snapshot.status,
            format_clock(snapshot.elapsed_seconds)
        );

        for (i, ex) in snapshot.exercises.iter().enumerate() {
            println!(
                "  {}. {}  {}/{} sets  rest {}{}",
                i + 1,
                ex.name,
                ex.completed_sets.len(),
                ex.planned_sets.len(),
                format_rest(ex.rest_seconds),
                if ex.is_complete { "  ✓" } else { "" }
            );
            for (n, set) in ex.completed_sets.iter().enumerate() {
                let rest = set
                    .rest_time_actual
                    .map(|r| format!(" (rest {})", format_clock(u64::from(r))))
                    .unwrap_or_default();
                println!("      set {}: {} x {}{}", n + 1, set.weight, set.reps, rest);
            }
        }

        let rest = &snapshot.rest;
        match rest.status {
            RestStatus::Idle => {}
            RestStatus::Counting => println!(
                "Rest: {} left for {}",
                format_rest(rest.remaining_seconds),
                rest.bound_exercise_index
                    .map(|i| self.name_of(i))
                    .unwrap_or_default()
            ),
            RestStatus::Expired => println!("Rest: over (type 'ack' to dismiss)"),
        }
    }
}

fn parse_arg<T: std::str::FromStr>(text: &str, what: &str) -> Result<T> {
    text.parse()
        .map_err(|_| Error::InvalidInput(format!("Invalid {}: '{}'", what, text)))
}

/// Split `<ex words...> <weight> <reps>`
fn split_set_args(args: &[&str], usage: &str) -> Result<(String, f64, i32)> {
    if args.len() < 3 {
        return Err(Error::InvalidInput(format!("usage: {}", usage)));
    }
    let n = args.len();
    let weight = parse_arg(args[n - 2], "weight")?;
    let reps = parse_arg(args[n - 1], "reps")?;
    Ok((args[..n - 2].join(" "), weight, reps))
}
