//! The state machine which walks a learner through a sequence of levels.
//!
//! A [`Session`] is synchronous. After each operation it goes into
//! [`Phase::Mutating`] and hands back a [`SettleTicket`]. The presentation
//! layer waits for [`Session::settle_delay()`] (e.g. while an animation
//! plays) and then calls [`Session::settle()`], at which point the session
//! works out whether the equation looks solved and starts accepting input
//! again.

use crate::{
    algebra::{ops::Operation, ParseError, ParseMode, TermMap},
    levels::Level,
    solve::{self, Solution},
    Equation,
};
use log::{debug, info, warn};
use smol_str::SmolStr;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    time::Duration,
};

/// Tunables for a [`Session`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// How long the presentation layer should wait between committing an
    /// operation and calling [`Session::settle()`].
    pub settle_delay: Duration,
    pub parse_mode: ParseMode,
}

impl SessionConfig {
    pub fn new() -> Self { SessionConfig::default() }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = parse_mode;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            settle_delay: Duration::from_millis(500),
            parse_mode: ParseMode::default(),
        }
    }
}

/// Somewhere to remember which level the learner was up to.
pub trait ProgressStore {
    fn load_level_index(&self) -> Option<usize>;
    fn save_level_index(&mut self, index: usize);
}

impl<P: ProgressStore + ?Sized> ProgressStore for &mut P {
    fn load_level_index(&self) -> Option<usize> { (**self).load_level_index() }

    fn save_level_index(&mut self, index: usize) {
        (**self).save_level_index(index);
    }
}

/// A [`ProgressStore`] which forgets everything when dropped.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InMemoryProgress {
    level_index: Option<usize>,
}

impl InMemoryProgress {
    pub fn starting_at(level_index: usize) -> Self {
        InMemoryProgress {
            level_index: Some(level_index),
        }
    }
}

impl ProgressStore for InMemoryProgress {
    fn load_level_index(&self) -> Option<usize> { self.level_index }

    fn save_level_index(&mut self, index: usize) {
        self.level_index = Some(index);
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No level has been loaded yet.
    Loading,
    /// Waiting for the learner.
    Ready,
    /// An operation has been committed but hasn't settled yet.
    Mutating,
    /// Every level has been solved.
    Complete,
}

/// How an entry came to be in the [`History`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The equation as the level was loaded.
    Loaded,
    Success,
    /// The operation was rejected and the equation is unchanged.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub equation: Equation,
    pub outcome: Outcome,
}

/// Every state the current level's equation has been in, oldest first.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct History {
    entries: Vec<Snapshot>,
}

impl History {
    fn seeded(equation: Equation) -> Self {
        History {
            entries: vec![Snapshot {
                equation,
                outcome: Outcome::Loaded,
            }],
        }
    }

    fn push(&mut self, equation: Equation, outcome: Outcome) {
        self.entries.push(Snapshot { equation, outcome });
    }

    /// Drop the latest entry and return the one before it, never removing
    /// the seed.
    fn undo(&mut self) -> Option<&Snapshot> {
        if self.entries.len() <= 1 {
            return None;
        }

        self.entries.pop();
        self.entries.last()
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn current(&self) -> Option<&Snapshot> { self.entries.last() }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> + '_ {
        self.entries.iter()
    }
}

/// Proof that an operation was committed, to be handed back to
/// [`Session::settle()`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SettleTicket {
    generation: u64,
}

/// The result of [`Session::apply()`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Commit {
    pub ticket: SettleTicket,
    pub outcome: Outcome,
}

/// One learner working through a list of [`Level`]s.
#[derive(Debug)]
pub struct Session<P> {
    levels: Vec<Level>,
    config: SessionConfig,
    progress: P,
    level_index: usize,
    phase: Phase,
    equation: Equation,
    target: SmolStr,
    history: History,
    true_solution: Option<Solution>,
    solved_looking: bool,
    answer_correct: bool,
    feedback: String,
    /// Bumped whenever a settle is issued or the level changes, so old
    /// tickets can be recognised.
    generation: u64,
}

impl<P: ProgressStore> Session<P> {
    /// Create a session with no level loaded. Call [`Session::load()`] or
    /// [`Session::resume()`] to get started.
    pub fn new(levels: Vec<Level>, config: SessionConfig, progress: P) -> Self {
        Session {
            levels,
            config,
            progress,
            level_index: 0,
            phase: Phase::Loading,
            equation: Equation::default(),
            target: SmolStr::default(),
            history: History::default(),
            true_solution: None,
            solved_looking: false,
            answer_correct: false,
            feedback: String::new(),
            generation: 0,
        }
    }

    /// Load whichever level the [`ProgressStore`] says we were up to.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        let index = self.progress.load_level_index().unwrap_or(0);
        self.load(index)
    }

    /// Start the level at `index` from scratch.
    ///
    /// Loading an index past the last level completes the session. If the
    /// level's equation can't be parsed, the current equation and history
    /// are kept.
    pub fn load(&mut self, index: usize) -> Result<(), SessionError> {
        let level = match self.levels.get(index) {
            Some(level) => level.clone(),
            None => {
                self.complete();
                return Err(SessionError::LevelOutOfRange {
                    index,
                    levels: self.levels.len(),
                });
            },
        };

        let mode = self.config.parse_mode;
        let loaded = Equation::parse_with(&level.initial_equation, mode)
            .and_then(|equation| {
                let solution = solve::solve_with(
                    &level.initial_equation,
                    &level.target_variable,
                    mode,
                )?;
                Ok((equation, solution))
            });

        let (equation, solution) = match loaded {
            Ok(pair) => pair,
            Err(e) => {
                warn!(
                    "Unable to load level {} (\"{}\"): {}",
                    level.id, level.initial_equation, e
                );
                self.feedback = format!("Unable to load level {}.", level.id);
                return Err(SessionError::Parse(e));
            },
        };

        info!(
            "Loaded level {}, \"{}\" with solution {}",
            level.id, equation, solution
        );

        self.feedback = if level.description.is_empty() {
            format!("Level {}: Balance both sides!", level.id)
        } else {
            level.description
        };
        self.target = level.target_variable;
        self.level_index = index;
        self.history = History::seeded(equation.clone());
        self.equation = equation;
        self.true_solution = Some(solution);
        self.solved_looking = false;
        self.answer_correct = false;
        self.phase = Phase::Ready;
        self.generation += 1;

        self.progress.save_level_index(index);

        Ok(())
    }

    /// Apply an operation to both sides of the equation.
    ///
    /// An invalid operand isn't an error as far as the session is
    /// concerned, the unchanged equation is committed with
    /// [`Outcome::Error`] so the learner gets some feedback.
    pub fn apply(&mut self, operation: &Operation) -> Result<Commit, SessionError> {
        self.ensure_playing()?;

        if self.answer_correct {
            self.feedback = String::from("You already found the correct answer!");
            return Err(SessionError::AlreadyCorrect);
        }
        if self.phase == Phase::Mutating {
            return Err(SessionError::Busy);
        }

        let (next, outcome) = match self.equation.apply(operation) {
            Ok(next) => {
                self.feedback = operation.describe();
                (next, Outcome::Success)
            },
            Err(e) => {
                warn!("Unable to {} on \"{}\": {}", operation, self.equation, e);
                self.feedback = format!("Error: {}", e);
                (self.equation.clone(), Outcome::Error)
            },
        };

        debug!("Committing \"{}\" ({:?})", next, outcome);
        self.history.push(next.clone(), outcome);
        self.equation = next;
        self.phase = Phase::Mutating;
        self.generation += 1;

        Ok(Commit {
            ticket: SettleTicket {
                generation: self.generation,
            },
            outcome,
        })
    }

    /// Finish the operation which issued `ticket`, re-checking whether the
    /// equation looks solved.
    ///
    /// Returns `false` and does nothing if the ticket is stale, i.e. the
    /// level was loaded or reset after it was issued.
    pub fn settle(&mut self, ticket: SettleTicket) -> bool {
        if self.phase != Phase::Mutating || ticket.generation != self.generation
        {
            debug!("Ignoring a stale settle ticket, {:?}", ticket);
            return false;
        }

        self.solved_looking = self.equation.is_solved_for(&self.target);
        self.phase = Phase::Ready;
        debug!("Settled, solved looking: {}", self.solved_looking);

        true
    }

    /// Go back to the equation as it was before the last operation.
    ///
    /// This doesn't change whether the learner's answer was correct.
    pub fn undo(&mut self) -> Result<(), SessionError> {
        self.ensure_playing()?;
        if self.phase == Phase::Mutating {
            return Err(SessionError::Busy);
        }

        let previous = match self.history.undo() {
            Some(snapshot) => snapshot.equation.clone(),
            None => {
                self.feedback = String::from("Cannot undo further.");
                return Err(SessionError::NothingToUndo);
            },
        };

        debug!("Undo, back to \"{}\"", previous);
        self.solved_looking = previous.is_solved_for(&self.target);
        self.equation = previous;
        self.feedback = String::from("Undo successful.");

        Ok(())
    }

    /// Throw away all progress on the current level.
    ///
    /// Any pending settle is cancelled.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.ensure_playing()?;
        self.load(self.level_index)
    }

    /// Check the learner's answer against the level's true solution.
    ///
    /// Returns whether the answer was correct. Text which isn't a number is
    /// an error, except for unsolvable equations where every answer is
    /// simply wrong.
    pub fn submit_answer(&mut self, text: &str) -> Result<bool, SessionError> {
        self.ensure_playing()?;
        let solution = self.true_solution.ok_or(SessionError::NotReady)?;

        if self.answer_correct {
            self.feedback = String::from("You already found the correct answer!");
            return Ok(true);
        }

        if solution == Solution::Unsolvable {
            self.feedback = String::from("Hmm, this equation seems unsolvable!");
            return Ok(false);
        }

        let answer = match parse_answer(text) {
            Some(answer) => answer,
            None => {
                self.feedback = String::from("Please enter a valid number.");
                return Err(SessionError::UnparseableAnswer {
                    input: text.to_string(),
                });
            },
        };

        if !solution.accepts(answer) {
            self.feedback = format!(
                "Not quite. Check your steps or calculation! You entered {}.",
                answer
            );
            return Ok(false);
        }

        self.answer_correct = true;
        self.feedback = match solution {
            Solution::Unique(value) => format!(
                "Correct! The solution is {} = {}. Well done!",
                self.target, value
            ),
            _ => String::from("Any number works here! (Infinite Solutions)"),
        };
        info!("Level {} answered correctly", self.level_index + 1);

        Ok(true)
    }

    /// Move on to the next level once the current one has been answered.
    pub fn advance(&mut self) -> Result<Phase, SessionError> {
        self.ensure_playing()?;

        if !self.answer_correct {
            self.feedback = String::from("Please enter the correct answer first!");
            return Err(SessionError::NotYetCorrect);
        }

        let next = self.level_index + 1;

        if next < self.levels.len() {
            self.load(next)?;
        } else {
            self.complete();
        }

        Ok(self.phase)
    }

    fn complete(&mut self) {
        info!("All levels completed");
        self.phase = Phase::Complete;
        self.feedback = String::from("Congratulations! All levels completed!");
        self.generation += 1;
    }

    fn ensure_playing(&self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Loading => Err(SessionError::NotReady),
            Phase::Complete => Err(SessionError::Complete),
            Phase::Ready | Phase::Mutating => Ok(()),
        }
    }
}

impl<P> Session<P> {
    pub fn equation(&self) -> &Equation { &self.equation }

    pub fn left(&self) -> &TermMap { &self.equation.left }

    pub fn right(&self) -> &TermMap { &self.equation.right }

    pub fn target(&self) -> &str { &self.target }

    pub fn phase(&self) -> Phase { self.phase }

    pub fn is_busy(&self) -> bool { self.phase == Phase::Mutating }

    /// Is the equation in the form `x = c` or `c = x`? Only updated once an
    /// operation has settled.
    pub fn solved_looking(&self) -> bool { self.solved_looking }

    pub fn answer_correct(&self) -> bool { self.answer_correct }

    pub fn feedback(&self) -> &str { &self.feedback }

    /// The solution to the current level's original equation.
    pub fn true_solution(&self) -> Option<Solution> { self.true_solution }

    pub fn history(&self) -> &History { &self.history }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.history.current().map(|snapshot| snapshot.outcome)
    }

    pub fn level_index(&self) -> usize { self.level_index }

    pub fn level(&self) -> Option<&Level> {
        match self.phase {
            Phase::Ready | Phase::Mutating => self.levels.get(self.level_index),
            Phase::Loading | Phase::Complete => None,
        }
    }

    pub fn levels(&self) -> &[Level] { &self.levels }

    pub fn settle_delay(&self) -> Duration { self.config.settle_delay }

    pub fn config(&self) -> &SessionConfig { &self.config }

    pub fn progress(&self) -> &P { &self.progress }
}

fn parse_answer(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Reasons a [`Session`] can refuse to do something.
///
/// None of these are fatal, the session is still usable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    LevelOutOfRange { index: usize, levels: usize },
    Parse(ParseError),
    /// No level has been loaded.
    NotReady,
    /// An operation is still settling.
    Busy,
    AlreadyCorrect,
    NothingToUndo,
    UnparseableAnswer { input: String },
    NotYetCorrect,
    /// Every level has already been completed.
    Complete,
}

impl From<ParseError> for SessionError {
    fn from(e: ParseError) -> Self { SessionError::Parse(e) }
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::LevelOutOfRange { index, levels } => write!(
                f,
                "There is no level {}, only {} levels are available",
                index, levels
            ),
            SessionError::Parse(_) => {
                write!(f, "Unable to parse the level's equation")
            },
            SessionError::NotReady => write!(f, "No level has been loaded"),
            SessionError::Busy => {
                write!(f, "The previous operation hasn't finished yet")
            },
            SessionError::AlreadyCorrect => {
                write!(f, "The level has already been answered correctly")
            },
            SessionError::NothingToUndo => write!(f, "Cannot undo further"),
            SessionError::UnparseableAnswer { input } => {
                write!(f, "\"{}\" is not a number", input)
            },
            SessionError::NotYetCorrect => {
                write!(f, "The level hasn't been answered correctly yet")
            },
            SessionError::Complete => write!(f, "All levels are complete"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionError::Parse(inner) => Some(inner),
            _ => None,
        }
    }
}
