use admin_console_operator::admin_console::AdminConsole;
use kube::CustomResourceExt;

fn main() {
    print!("{}", serde_yaml::to_string(&AdminConsole::crd()).expect("Failed to serialize CRD"));
}
