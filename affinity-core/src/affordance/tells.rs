//! Narrative pools for the stock affordances.
//!
//! Tells describe what the world does, never why. None of them may mention
//! numbers or the band vocabulary; the catalog validator enforces that.

/// Travel is harder.
pub const PATH_HOSTILE: &[&str] = &[
    "The path seems longer than you remember.",
    "Brambles catch at your clothes.",
    "You keep losing your footing on loose stones.",
    "The trail doubles back unexpectedly.",
    "Roots seem to rise just where you step.",
];

/// Travel is easier.
pub const PATH_FAVORABLE: &[&str] = &[
    "An easy path opens through the undergrowth.",
    "Your feet find sure footing on the trail.",
    "The journey passes quickly.",
    "A shortcut appears, as if made for you.",
    "The way forward is unusually clear.",
];

/// Travel ended somewhere unexpected.
pub const MISDIRECTION_HOSTILE: &[&str] = &[
    "Wait... this isn't where you meant to go.",
    "The familiar landmark was wrong.",
    "You emerge somewhere unexpected.",
    "The path led you astray.",
];

/// Creatures are drawn in.
pub const ENCOUNTER_HOSTILE: &[&str] = &[
    "Something watches from the shadows.",
    "Wolves circle at the edge of vision.",
    "The forest's creatures are restless.",
    "Eyes gleam in the underbrush.",
    "Predators seem drawn to this spot.",
];

/// Creatures keep their distance.
pub const ENCOUNTER_FAVORABLE: &[&str] = &[
    "The usual dangers keep their distance.",
    "A deer watches you calmly.",
    "Birdsong fills the air.",
    "Small creatures go about their business, unconcerned.",
    "The wildlife here seems peaceful.",
];

/// Harvests fail.
pub const RESOURCE_HOSTILE: &[&str] = &[
    "The herbs here are sparse and withered.",
    "This vein has gone barren.",
    "The fish aren't biting.",
    "What you seek remains hidden.",
    "Pickings are slim here.",
];

/// Harvests flourish.
pub const RESOURCE_FAVORABLE: &[&str] = &[
    "Rich deposits practically surface themselves.",
    "Herbs grow thick and healthy here.",
    "The land gives freely.",
    "Hidden abundance reveals itself.",
    "A bounty appears before you.",
];

/// Magic resists.
pub const SPELL_HOSTILE: &[&str] = &[
    "Your magic feels sluggish here.",
    "The weave resists your touch.",
    "Something dampens your power.",
    "The spell sputters unexpectedly.",
    "Magic flows reluctantly.",
];

/// Magic answers.
pub const SPELL_FAVORABLE: &[&str] = &[
    "Magic flows easily here.",
    "Your spell flares bright.",
    "The land lends its strength.",
    "Power wells up from the earth.",
    "The weave responds eagerly.",
];

/// Rest is poor.
pub const REST_HOSTILE: &[&str] = &[
    "Sleep comes fitfully.",
    "You wake more tired than when you lay down.",
    "Uneasy dreams trouble your rest.",
    "The ground is cold and hard.",
    "You startle awake repeatedly.",
];

/// Rest restores.
pub const REST_FAVORABLE: &[&str] = &[
    "Deep, restorative sleep.",
    "You wake refreshed and ready.",
    "Peaceful dreams of distant places.",
    "The earth cradles you gently.",
    "Morning comes too soon, but you feel renewed.",
];

/// Ambient, mildly hostile.
pub const AMBIENT_UNEASY: &[&str] = &["Something feels off here.", "An uneasy stillness hangs in the air."];
/// Ambient, watchful.
pub const AMBIENT_WATCHFUL: &[&str] = &["You can't shake the feeling of being observed.", "The shadows seem to watch."];
/// Ambient, oppressive.
pub const AMBIENT_OPPRESSIVE: &[&str] = &["The air itself seems heavy with disapproval.", "A weight presses on your shoulders."];
/// Ambient, menacing.
pub const AMBIENT_MENACING: &[&str] = &["Every shadow seems to reach toward you.", "The darkness here is hungry."];
/// Ambient, mildly favorable.
pub const AMBIENT_PLEASANT: &[&str] = &["The light seems warmer here.", "A pleasant calm settles over you."];
/// Ambient, welcoming.
pub const AMBIENT_WELCOMING: &[&str] = &["You feel oddly at home.", "The space seems to welcome you."];
/// Ambient, protected.
pub const AMBIENT_PROTECTED: &[&str] = &["A sense of safety settles over you.", "You feel sheltered here."];
/// Ambient, blessed.
pub const AMBIENT_BLESSED: &[&str] = &["The very air seems to embrace you.", "A profound peace fills this place."];

/// Finds are spoiled.
pub const LOOT_HOSTILE: &[&str] = &[
    "Rust and decay everywhere.",
    "The chest's contents are disappointing.",
    "Moths have been at this.",
    "Whatever was here, time has claimed it.",
];

/// Finds are fine.
pub const LOOT_FAVORABLE: &[&str] = &[
    "Something glints in the corner.",
    "Remarkably well-preserved.",
    "A hidden cache reveals itself.",
    "The best of the lot, as if waiting for you.",
];

/// Weather turns.
pub const WEATHER_HOSTILE: &[&str] = &[
    "A sudden chill wind picks up.",
    "Clouds gather overhead.",
    "Mist rolls in unexpectedly.",
    "The sun finds a cloud just as you arrive.",
];

/// Weather eases.
pub const WEATHER_FAVORABLE: &[&str] = &[
    "The clouds part briefly.",
    "A warm breeze carries pleasant scents.",
    "The mist clears as you approach.",
    "Sunlight follows your path.",
];

/// Animals as ill omens.
pub const MESSENGER_HOSTILE: &[&str] = &[
    "A crow follows overhead, watching.",
    "Rats scatter at your approach.",
    "A fox regards you with unusual intensity.",
    "Insects swarm thicker here.",
    "Something howls in the distance, at you, it seems.",
];

/// Animals as good omens.
pub const MESSENGER_FAVORABLE: &[&str] = &[
    "A songbird alights nearby.",
    "Butterflies dance in your wake.",
    "A doe raises her head, unafraid.",
    "Bees hum peacefully as you pass.",
    "A hawk circles lazily above, a good omen.",
];

/// Owned copy of a static pool.
#[must_use]
pub fn pool(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|line| (*line).to_string()).collect()
}
