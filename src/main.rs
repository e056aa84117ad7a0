use flow_viewer::ViewerConfig;

fn main() -> anyhow::Result<()> {
    flow_viewer::run(ViewerConfig::default())
}
