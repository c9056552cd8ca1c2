pub mod pricing_run;
