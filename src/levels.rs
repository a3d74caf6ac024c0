//! Level descriptors and the built-in level set.

use smol_str::SmolStr;

/// One equation for the learner to solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    pub id: u32,
    pub initial_equation: String,
    /// The variable the learner is meant to isolate.
    pub target_variable: SmolStr,
    pub description: String,
}

impl Level {
    pub fn new<E, T, D>(
        id: u32,
        initial_equation: E,
        target: T,
        description: D,
    ) -> Self
    where
        E: Into<String>,
        T: AsRef<str>,
        D: Into<String>,
    {
        Level {
            id,
            initial_equation: initial_equation.into(),
            target_variable: SmolStr::new(target.as_ref()),
            description: description.into(),
        }
    }
}

/// The levels which ship with the engine, easiest first.
pub fn builtin() -> Vec<Level> {
    const LEVELS: &[(&str, &str)] = &[
        // adding and subtracting
        ("x + 1 = 4", "Remove 1 from each side."),
        ("x + 3 = 5", "Balance the constants."),
        ("x - 2 = 1", "Add 2 to both sides to balance."),
        ("5 = x + 2", "Isolate x, it can live on either side."),
        ("x - 1 = -3", "Balance with negative numbers."),
        // multiplying and dividing
        ("2x = 6", "Divide both sides by 2."),
        ("4x = 12", "How many ones are in each x?"),
        ("-3x = 9", "Handle the negative coefficient."),
        ("10 = 5x", "Share the constant out equally."),
        ("1x = 4", "Sometimes it's already simple!"),
        // two steps
        ("2x + 1 = 7", "First remove the constant, then divide."),
        ("3x - 2 = 10", "Add to both sides first, then divide."),
        ("5x + 5 = 15", "Balance the constants, then the variables."),
        ("1 = 2x - 5", "Isolate the x term first."),
        ("-x + 3 = 1", "Handle the negative x."),
        // variables on both sides
        ("4x = 2x + 6", "Group the x terms on one side."),
        ("5x + 1 = 2x + 7", "Group the x terms, then the constants."),
        ("3x - 4 = x + 2", "Balance both kinds of term."),
        ("x = -2x + 9", "Combine the x terms."),
        ("2x - 3 = 4x - 7", "Careful grouping needed!"),
        // edge cases
        ("2x + 5 = 2x - 1", "What happens when the variables cancel?"),
        ("3x + 4 = 3x + 4", "What happens when everything cancels?"),
        ("0.5x + 1 = 3", "Work with decimals."),
        ("5 - x = 2x + 11", "Final challenge!"),
    ];

    LEVELS
        .iter()
        .enumerate()
        .map(|(i, &(equation, description))| {
            Level::new(i as u32 + 1, equation, "x", description)
        })
        .collect()
}
