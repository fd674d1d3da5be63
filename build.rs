fn main() {
    // cfg.toml の変更で設定を再生成する
    println!("cargo:rerun-if-changed=cfg.toml");
}
