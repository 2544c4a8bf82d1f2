pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const DATABASE: &str = "🗄️";
    pub const TABLE: &str = "📋";
    pub const FILE: &str = "📄";
    pub const REPORT: &str = "📝";
    pub const SEED: &str = "🌱";
    pub const CLOCK: &str = "⏱️";
    pub const MAG: &str = "🔎";
}
