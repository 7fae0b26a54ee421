#![allow(dead_code)]

use sqlfluent::prelude::*;

/// Install a test logger once; repeated calls are no-ops
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// In-memory SQLite connection with an empty `users` table
pub fn memory_db() -> Connection {
    init_logging();
    let conn = Connection::connect("sqlite::memory:").unwrap();
    conn.query(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT,
            age INTEGER NOT NULL,
            vip INTEGER NOT NULL DEFAULT 0
        )",
    )
    .unwrap()
    .exec()
    .unwrap();
    conn
}

/// Insert `n` users named `user<i>` aged `17 + i`, every fifth one a VIP
pub fn seed_users(conn: &Connection, n: i64) {
    conn.transaction(|tx| {
        for i in 1..=n {
            tx.table("users")
                .insert([
                    ("name", SqlValue::from(format!("user{}", i))),
                    ("email", SqlValue::from(format!("user{}@example.com", i))),
                    ("age", SqlValue::from(17 + i)),
                    ("vip", SqlValue::from(i64::from(i % 5 == 0))),
                ])?
                .exec()?;
        }
        Ok(())
    })
    .unwrap();
}
