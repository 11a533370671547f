use rand::Rng;

/// Riddle pool. Draws are uniform with replacement, so a riddle can
/// repeat across rounds of the same game.
const RIDDLES: &[&str] = &[
    "Find me something that holds memories but has no brain",
    "Capture a guardian that never sleeps but never moves",
    "Show me a bridge between two worlds",
    "Find something older than you that's still working hard",
    "Catch a tiny sun that lives indoors",
    "Show me nature's artwork on something man-made",
    "Find a number that tells a story",
    "Capture something that was once alive but now decorates",
    "Show me a reflection of something that isn't there",
    "Find a container of possibilities",
];

/// Draw a random riddle from the pool
pub fn draw_riddle() -> &'static str {
    let mut rng = rand::rng();
    RIDDLES[rng.random_range(0..RIDDLES.len())]
}
