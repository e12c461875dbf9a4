pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cases (
    id TEXT PRIMARY KEY,
    customer_name TEXT NOT NULL,
    intro TEXT NOT NULL,
    avatar TEXT NOT NULL,
    order_index INTEGER NOT NULL UNIQUE,
    budget TEXT NOT NULL,
    decision_level TEXT NOT NULL,
    personality JSON NOT NULL DEFAULT '[]',
    points JSON NOT NULL DEFAULT '[]',
    background TEXT NOT NULL,
    script TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS attempts (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    case_id TEXT NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
    messages JSON NOT NULL DEFAULT '[]',
    is_complete INTEGER NOT NULL DEFAULT 0 CHECK (is_complete IN (0, 1)),
    score INTEGER CHECK (score BETWEEN 0 AND 100),
    stars INTEGER CHECK (stars BETWEEN 0 AND 5),
    report TEXT,
    version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    completed_at TEXT,
    CHECK (
        (is_complete = 0 AND score IS NULL AND stars IS NULL AND report IS NULL)
        OR (is_complete = 1 AND score IS NOT NULL AND stars IS NOT NULL AND report IS NOT NULL)
    )
);

CREATE TABLE IF NOT EXISTS progress (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    case_id TEXT NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
    best_score INTEGER NOT NULL DEFAULT 0 CHECK (best_score BETWEEN 0 AND 100),
    best_stars INTEGER NOT NULL DEFAULT 0 CHECK (best_stars BETWEEN 0 AND 5),
    total_attempts INTEGER NOT NULL DEFAULT 0 CHECK (total_attempts >= 0),
    first_completed_at TEXT,
    last_attempt_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, case_id)
);

CREATE INDEX IF NOT EXISTS idx_attempts_lookup ON attempts(user_id, case_id, is_complete);
CREATE INDEX IF NOT EXISTS idx_attempts_created ON attempts(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_progress_user ON progress(user_id);

-- Only one open attempt per user and case at a time
CREATE UNIQUE INDEX IF NOT EXISTS idx_one_open_attempt
    ON attempts(user_id, case_id) WHERE is_complete = 0;
"#;
