use serde::Serialize;

/// Context for the database setup script
/// Placeholders: {{db_host}}, {{db_name}}, {{db_user}}, {{db_password}}, {{admin_email}},
/// {{admin_password}}, {{migration_path}}, {{generated_at}}, {{version}}
#[derive(Debug, Clone, Serialize)]
pub struct SetupScriptContext {
    pub db_host: String,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub admin_email: String,
    pub admin_password: String,
    /// Migration file relative to the script's own directory
    pub migration_path: String,
    pub generated_at: String,
    pub version: String,
}

/// Embedded PHP template for the one-time setup script.
/// Every value placeholder sits inside a single-quoted PHP string.
pub const SETUP_SCRIPT_TEMPLATE: &str = r#"<?php
// One-time database setup generated by webdeploy {{version}} at {{generated_at}}.
// DELETE THIS FILE FROM THE SERVER IMMEDIATELY AFTER RUNNING IT.
error_reporting(E_ALL);
ini_set('display_errors', 1);

if (isset($_GET['delete'])) {
    if (unlink(__FILE__)) {
        echo "Setup file deleted.";
    } else {
        echo "Could not delete the setup file. Remove it manually via FTP!";
    }
    exit;
}

$config = [
    'host' => '{{db_host}}',
    'name' => '{{db_name}}',
    'user' => '{{db_user}}',
    'password' => '{{db_password}}',
];

try {
    $pdo = new PDO(
        "mysql:host={$config['host']};dbname={$config['name']};charset=utf8mb4",
        $config['user'],
        $config['password'],
        [PDO::ATTR_ERRMODE => PDO::ERRMODE_EXCEPTION]
    );

    $migrationFile = __DIR__ . '/{{migration_path}}';
    $sql = file_get_contents($migrationFile);
    if ($sql === false) {
        throw new RuntimeException('Cannot read migration file');
    }

    // Line comments and DELIMITER directives are meaningless to PDO
    $sql = preg_replace('/^\s*--.*$/m', '', $sql);
    $sql = preg_replace('/DELIMITER\s+\$\$/', '', $sql);
    $sql = preg_replace('/DELIMITER\s+;/', '', $sql);
    $sql = str_replace('$$', ';', $sql);

    $statements = array_filter(array_map('trim', explode(';', $sql)));
    $executed = 0;
    $existing = 0;
    foreach ($statements as $statement) {
        if ($statement === '') {
            continue;
        }
        try {
            $pdo->exec($statement);
            $executed++;
        } catch (PDOException $e) {
            // 42S01: table already exists
            if ($e->getCode() !== '42S01') {
                throw $e;
            }
            $existing++;
        }
    }
    echo "Executed {$executed} statements ({$existing} tables already existed).<br>";

    $adminPassword = password_hash('{{admin_password}}', PASSWORD_BCRYPT, ['cost' => 12]);
    $update = $pdo->prepare('UPDATE users SET password = ? WHERE email = ?');
    $update->execute([$adminPassword, '{{admin_email}}']);

    if ($update->rowCount() > 0) {
        echo "Admin password set.<br>";
    } else {
        $insert = $pdo->prepare(
            "INSERT IGNORE INTO users (name, email, password, role, is_active, created_at, updated_at)
             VALUES ('Administrator', ?, ?, 'admin', 1, NOW(), NOW())"
        );
        $insert->execute(['{{admin_email}}', $adminPassword]);
        if ($insert->rowCount() === 0) {
            throw new RuntimeException('Admin user could not be updated or created');
        }
        echo "Admin user created.<br>";
    }

    $admins = $pdo->query("SELECT COUNT(*) AS count FROM users WHERE role = 'admin'")->fetch();
    echo "Database setup completed. Admin users: {$admins['count']}<br>";
    echo "Admin user: " . htmlspecialchars('{{admin_email}}') . "<br>";
    echo "<br><strong>IMPORTANT: delete this file now!</strong>";
    echo "<form method=\"post\" action=\"?delete=1\"><button type=\"submit\">Delete this setup file</button></form>";
} catch (Exception $e) {
    echo "Database error: " . htmlspecialchars($e->getMessage());
}
"#;
